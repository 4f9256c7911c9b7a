//! Area topology — the default display order of the plant's production
//! areas. Area membership itself stays data-driven from `Asset::area`;
//! this module only fixes the order a briefing presents areas in.

pub const DEFAULT_AREA_ORDER: &[&str] = &["Grinding", "Welding", "Assembly", "Painting", "Packing", "Quality", "Shipping"];

/// Resolves the area order to use for a briefing: named areas in
/// `preference` come first, in the order given, and any area absent from
/// `preference` is appended afterward in the default order.
pub fn resolve_area_order(preference: Option<&[String]>) -> Vec<String> {
    let Some(preference) = preference else {
        return DEFAULT_AREA_ORDER.iter().map(|area| (*area).to_string()).collect();
    };
    let mut order: Vec<String> = preference.to_vec();
    for area in DEFAULT_AREA_ORDER {
        if !order.iter().any(|a| a == area) {
            order.push((*area).to_string());
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_preference_uses_default_order() {
        let order = resolve_area_order(None);
        let expected: Vec<String> = DEFAULT_AREA_ORDER.iter().map(|a| a.to_string()).collect();
        assert_eq!(order, expected);
    }

    #[test]
    fn preference_wins_and_missing_areas_append_in_default_order() {
        let preference = vec!["Packing".to_string(), "Grinding".to_string()];
        let order = resolve_area_order(Some(&preference));
        assert_eq!(order[0], "Packing");
        assert_eq!(order[1], "Grinding");
        assert_eq!(order.len(), DEFAULT_AREA_ORDER.len());
        assert!(order.contains(&"Shipping".to_string()));
    }

    #[test]
    fn preference_naming_an_unknown_area_is_kept_verbatim() {
        let preference = vec!["Custom Cell".to_string()];
        let order = resolve_area_order(Some(&preference));
        assert_eq!(order[0], "Custom Cell");
        assert_eq!(order.len(), DEFAULT_AREA_ORDER.len() + 1);
    }
}
