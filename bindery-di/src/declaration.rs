//! Declaration strength and origin tracking.

use crate::precision::PreciserThan;
use std::borrow::Cow;
use std::fmt::{Display, Formatter};

/// Strength of a declaration, ordered from weakest to strongest. The strength decides what happens
/// when multiple declarations bind the same [Resource](crate::resource::Resource).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DeclarationType {
    /// Fallback bindings emitted as a side effect of other declarations. The last one wins.
    Implicit,
    /// Default bindings, which can be overridden by any stronger one. Two defaults clash.
    Default,
    /// Bindings provided by the environment. Duplicates cancel each other out.
    Provided,
    /// Automatically derived bindings, e.g. for supertypes. Duplicates cancel each other out.
    Auto,
    /// Bindings intended to co-exist with other bindings of the same resource.
    Multi,
    /// Regular bindings. Two explicit bindings clash.
    Explicit,
    /// Placeholder demanding that a concrete binding is provided by some other declaration.
    Required,
}

impl DeclarationType {
    #[inline]
    fn ordinal(self) -> u8 {
        self as u8
    }

    /// Checks if both declarations of the same resource cannot be resolved.
    pub fn clashes_with(self, other: DeclarationType) -> bool {
        let both_concrete = self != DeclarationType::Required && other != DeclarationType::Required;

        (both_concrete && self.ordinal() + other.ordinal() > 2 * DeclarationType::Multi.ordinal())
            || (self == DeclarationType::Default && other == DeclarationType::Default)
    }

    /// Checks if a declaration of this strength is superseded by a later one of `other`.
    pub fn replaced_by(self, other: DeclarationType) -> bool {
        other > self || (self == DeclarationType::Implicit && other == DeclarationType::Implicit)
    }

    /// Checks if both declarations cancel each other out.
    pub fn nullified_by(self, other: DeclarationType) -> bool {
        self == other && matches!(self, DeclarationType::Auto | DeclarationType::Provided)
    }
}

impl PreciserThan for DeclarationType {
    fn more_precise_than(&self, other: &DeclarationType) -> bool {
        self > other
    }
}

impl Display for DeclarationType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            DeclarationType::Implicit => "IMPLICIT",
            DeclarationType::Default => "DEFAULT",
            DeclarationType::Provided => "PROVIDED",
            DeclarationType::Auto => "AUTO",
            DeclarationType::Multi => "MULTI",
            DeclarationType::Explicit => "EXPLICIT",
            DeclarationType::Required => "REQUIRED",
        })
    }
}

/// Where a declaration comes from, used in diagnostics.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Source {
    /// Identifies the declaring module.
    pub ident: Cow<'static, str>,
    /// Position of the declaration within its module.
    pub declaration_no: usize,
    pub declaration_type: DeclarationType,
}

impl Source {
    pub fn new<I: Into<Cow<'static, str>>>(
        ident: I,
        declaration_no: usize,
        declaration_type: DeclarationType,
    ) -> Self {
        Self {
            ident: ident.into(),
            declaration_no,
            declaration_type,
        }
    }

    /// Same origin, different strength.
    pub fn typed(&self, declaration_type: DeclarationType) -> Self {
        Self {
            declaration_type,
            ..self.clone()
        }
    }
}

impl Display for Source {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}#{}[{}]",
            self.ident, self.declaration_no, self.declaration_type
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::declaration::{DeclarationType, Source};
    use DeclarationType::*;

    const ALL: [DeclarationType; 7] = [
        Implicit, Default, Provided, Auto, Multi, Explicit, Required,
    ];

    #[test]
    fn should_clash_symmetrically() {
        for one in ALL {
            for other in ALL {
                assert_eq!(one.clashes_with(other), other.clashes_with(one));
            }
        }
    }

    #[test]
    fn should_clash_strong_declarations() {
        assert!(Explicit.clashes_with(Explicit));
        assert!(Explicit.clashes_with(Multi));
        assert!(Default.clashes_with(Default));
        assert!(!Multi.clashes_with(Multi));
        assert!(!Required.clashes_with(Explicit));
        assert!(!Explicit.clashes_with(Auto));
    }

    #[test]
    fn should_replace_by_stronger_declarations() {
        assert!(Auto.replaced_by(Explicit));
        assert!(Implicit.replaced_by(Implicit));
        assert!(!Default.replaced_by(Implicit));
        assert!(!Explicit.replaced_by(Explicit));
    }

    #[test]
    fn should_nullify_auto_and_provided() {
        assert!(Auto.nullified_by(Auto));
        assert!(Provided.nullified_by(Provided));
        assert!(!Auto.nullified_by(Provided));
        assert!(!Explicit.nullified_by(Explicit));
    }

    #[test]
    fn should_display_source() {
        let source = Source::new("app", 3, Explicit);
        assert_eq!(source.typed(Implicit).to_string(), "app#3[IMPLICIT]");
    }
}
