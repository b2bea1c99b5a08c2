//! Resolution phases form a finite, totally ordered lattice.
//!
//! A declaration starts at [`Phase::INITIAL`] and is advanced one step at a
//! time until it reaches the phase a consumer asked for.

use std::{
    cmp::Ordering,
    fmt::{Debug, Display},
    hash::Hash,
};

use thiserror::Error;

pub trait Phase: Copy + Ord + Hash + Debug + Display + Send + Sync + 'static {
    const INITIAL: Self;
    const TERMINAL: Self;
    const COUNT: usize;

    /// Zero based position in the lattice.
    fn position(self) -> usize;

    fn from_position(position: usize) -> Option<Self>;

    fn name(self) -> &'static str;

    fn next(self) -> Option<Self> {
        Self::from_position(self.position() + 1)
    }

    fn previous(self) -> Option<Self> {
        self.position().checked_sub(1).and_then(Self::from_position)
    }

    fn compare(self, other: Self) -> Ordering {
        self.position().cmp(&other.position())
    }

    fn is_initial(self) -> bool {
        self.position() == 0
    }

    fn is_terminal(self) -> bool {
        self.position() + 1 == Self::COUNT
    }

    /// Every phase from `INITIAL` to `TERMINAL`.
    fn all() -> impl Iterator<Item = Self> {
        (0..Self::COUNT).filter_map(Self::from_position)
    }

    /// Every phase from `INITIAL` up to and including `self`.
    fn up_to(self) -> impl Iterator<Item = Self> {
        (0..=self.position()).filter_map(Self::from_position)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown phase `{label}`, expected one of: {expected}")]
pub struct UnknownPhase {
    pub label: String,
    pub expected: String,
}

/// Declares a phase lattice. Variants are ordered as written.
///
/// ```
/// strata_resolver::define_phases! {
///     pub enum Stage {
///         Parsed => "parsed",
///         Checked => "checked",
///     }
/// }
///
/// use strata_resolver::phase::Phase;
///
/// assert_eq!(Stage::INITIAL.next(), Some(Stage::Checked));
/// assert_eq!("checked".parse::<Stage>(), Ok(Stage::Checked));
/// ```
#[macro_export]
macro_rules! define_phases {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident => $label:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        $vis enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            pub const VARIANTS: &'static [$name] = &[$($name::$variant),+];
            pub const LABELS: &'static [&'static str] = &[$($label),+];
        }

        impl $crate::phase::Phase for $name {
            const INITIAL: Self = Self::VARIANTS[0];
            const TERMINAL: Self = Self::VARIANTS[Self::VARIANTS.len() - 1];
            const COUNT: usize = Self::VARIANTS.len();

            fn position(self) -> usize {
                self as usize
            }

            fn from_position(position: usize) -> Option<Self> {
                Self::VARIANTS.get(position).copied()
            }

            fn name(self) -> &'static str {
                Self::LABELS[self as usize]
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str($crate::phase::Phase::name(*self))
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::phase::UnknownPhase;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::LABELS
                    .iter()
                    .position(|label| *label == s)
                    .map(|position| Self::VARIANTS[position])
                    .ok_or_else(|| $crate::phase::UnknownPhase {
                        label: s.to_owned(),
                        expected: Self::LABELS.join(", "),
                    })
            }
        }
    };
}

define_phases! {
    /// The default lattice used for class based languages.
    pub enum ResolvePhase {
        /// Only the raw syntax is known.
        Raw => "raw",
        Imports => "imports",
        SupertypesResolved => "supertypes",
        SignaturesResolved => "signatures",
        BodiesResolved => "bodies",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lattice_is_ordered() {
        assert_eq!(ResolvePhase::INITIAL, ResolvePhase::Raw);
        assert_eq!(ResolvePhase::TERMINAL, ResolvePhase::BodiesResolved);
        assert_eq!(ResolvePhase::COUNT, 5);

        let all = ResolvePhase::all().collect::<Vec<_>>();
        assert_eq!(all, ResolvePhase::VARIANTS);

        for pair in all.windows(2) {
            assert_eq!(pair[0].next(), Some(pair[1]));
            assert_eq!(pair[1].previous(), Some(pair[0]));
            assert_eq!(pair[0].compare(pair[1]), Ordering::Less);
        }
    }

    #[test]
    fn terminal_has_no_next() {
        assert_eq!(ResolvePhase::TERMINAL.next(), None);
        assert_eq!(ResolvePhase::INITIAL.previous(), None);
        assert!(ResolvePhase::TERMINAL.is_terminal());
        assert!(ResolvePhase::INITIAL.is_initial());
    }

    #[test]
    fn parses_labels() {
        assert_eq!(
            "signatures".parse::<ResolvePhase>(),
            Ok(ResolvePhase::SignaturesResolved)
        );
        assert_eq!(ResolvePhase::Imports.to_string(), "imports");

        let err = "typed".parse::<ResolvePhase>().unwrap_err();
        assert_eq!(err.label, "typed");
        assert!(err.expected.contains("bodies"));
    }

    #[test]
    fn up_to_includes_self() {
        let phases = ResolvePhase::SupertypesResolved.up_to().collect::<Vec<_>>();
        assert_eq!(
            phases,
            [
                ResolvePhase::Raw,
                ResolvePhase::Imports,
                ResolvePhase::SupertypesResolved
            ]
        );
    }
}
