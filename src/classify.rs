// src/classify.rs

//! Eligibility classification for the context-menu commands
//!
//! A pure function of the selection snapshot taken at menu-build time.
//! Exactly one of the two real conversion commands is ever enabled, and
//! only for a homogeneous selection of convertible units; anything else
//! gets the disabled explanatory placeholder.

use crate::unit::{SelectedObject, UnitKind};

/// Which menu entry the current selection exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuVisibility {
    /// Homogeneous stateful selection: enable "convert to stateless"
    ConvertToStateless,
    /// Homogeneous stateless selection: enable "convert to stateful"
    ConvertToStateful,
    /// Mixed kinds or a non-convertible member: both real commands hidden,
    /// disabled placeholder shown
    Placeholder,
    /// Empty selection: nothing shown, command not invocable
    Hidden,
}

impl MenuVisibility {
    /// The conversion direction this visibility enables, if any
    pub fn direction(&self) -> Option<UnitKind> {
        match self {
            Self::ConvertToStateless => Some(UnitKind::Stateless),
            Self::ConvertToStateful => Some(UnitKind::Stateful),
            Self::Placeholder | Self::Hidden => None,
        }
    }
}

/// Classify a selection snapshot. No side effects.
pub fn classify(selection: &[SelectedObject]) -> MenuVisibility {
    let Some(first) = selection.first() else {
        return MenuVisibility::Hidden;
    };

    let Some(kind) = first.kind.as_unit_kind() else {
        return MenuVisibility::Placeholder;
    };

    let homogeneous = selection
        .iter()
        .all(|obj| obj.kind.as_unit_kind() == Some(kind));
    if !homogeneous {
        return MenuVisibility::Placeholder;
    }

    match kind {
        UnitKind::Stateful => MenuVisibility::ConvertToStateless,
        UnitKind::Stateless => MenuVisibility::ConvertToStateful,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::UnitHandle;
    use crate::unit::ObjectKind;

    fn selected(name: &str, kind: ObjectKind) -> SelectedObject {
        SelectedObject {
            handle: UnitHandle(0),
            name: name.to_string(),
            kind,
        }
    }

    #[test]
    fn test_empty_selection_hidden() {
        assert_eq!(classify(&[]), MenuVisibility::Hidden);
    }

    #[test]
    fn test_homogeneous_stateful_enables_to_stateless() {
        let selection = vec![
            selected("A", ObjectKind::Stateful),
            selected("B", ObjectKind::Stateful),
        ];
        let visibility = classify(&selection);
        assert_eq!(visibility, MenuVisibility::ConvertToStateless);
        assert_eq!(visibility.direction(), Some(UnitKind::Stateless));
    }

    #[test]
    fn test_homogeneous_stateless_enables_to_stateful() {
        let selection = vec![selected("A", ObjectKind::Stateless)];
        assert_eq!(classify(&selection), MenuVisibility::ConvertToStateful);
    }

    #[test]
    fn test_mixed_kinds_show_placeholder() {
        let selection = vec![
            selected("A", ObjectKind::Stateful),
            selected("B", ObjectKind::Stateless),
        ];
        assert_eq!(classify(&selection), MenuVisibility::Placeholder);
    }

    #[test]
    fn test_any_nonconvertible_member_shows_placeholder() {
        let selection = vec![
            selected("A", ObjectKind::Stateful),
            selected("DB1", ObjectKind::Other("DataBlock".to_string())),
        ];
        assert_eq!(classify(&selection), MenuVisibility::Placeholder);

        // homogeneous but non-convertible
        let selection = vec![
            selected("DB1", ObjectKind::Other("DataBlock".to_string())),
            selected("DB2", ObjectKind::Other("DataBlock".to_string())),
        ];
        assert_eq!(classify(&selection), MenuVisibility::Placeholder);
    }

    #[test]
    fn test_placeholder_has_no_direction() {
        assert_eq!(MenuVisibility::Placeholder.direction(), None);
        assert_eq!(MenuVisibility::Hidden.direction(), None);
    }
}
