use std::fmt;

/// Kind of placement origin authored into the venue scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AnchorRole {
    Table,
    Cashier,
    Sign,
    Shelf,
}

impl AnchorRole {
    pub const ALL: [AnchorRole; 4] = [
        AnchorRole::Table,
        AnchorRole::Cashier,
        AnchorRole::Sign,
        AnchorRole::Shelf,
    ];

    pub fn base_name(self) -> &'static str {
        match self {
            AnchorRole::Table => "Table",
            AnchorRole::Cashier => "Cashier",
            AnchorRole::Sign => "Sign",
            AnchorRole::Shelf => "Shelf",
        }
    }

    /// Authored node name for a 0-based slot (`Sign` slot 1 is `Sign2`).
    pub fn node_name(self, slot: usize) -> String {
        format!("{}{}", self.base_name(), slot + 1)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnchorKey {
    pub role: AnchorRole,
    pub slot: usize,
}

impl AnchorKey {
    #[inline]
    pub fn new(role: AnchorRole, slot: usize) -> Self {
        Self { role, slot }
    }
}

impl fmt::Display for AnchorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.role.node_name(self.slot))
    }
}

/// Classifies a node name as an anchor.
///
/// Accepts `<Role><n>` or `<Role>_<n>` in any letter case with `n >= 1`; the slot is `n - 1`.
pub fn parse_anchor_name(name: &str) -> Option<AnchorKey> {
    AnchorRole::ALL.into_iter().find_map(|role| {
        let base = role.base_name();
        let head = name.get(..base.len())?;
        if !head.eq_ignore_ascii_case(base) {
            return None;
        }

        let rest = &name[base.len()..];
        let digits = rest.strip_prefix('_').unwrap_or(rest);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        let n: usize = digits.parse().ok()?;
        n.checked_sub(1).map(|slot| AnchorKey::new(role, slot))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_authored_names() {
        assert_eq!(
            parse_anchor_name("Sign2"),
            Some(AnchorKey::new(AnchorRole::Sign, 1))
        );
        assert_eq!(
            parse_anchor_name("table_1"),
            Some(AnchorKey::new(AnchorRole::Table, 0))
        );
        assert_eq!(
            parse_anchor_name("CASHIER3"),
            Some(AnchorKey::new(AnchorRole::Cashier, 2))
        );
        assert_eq!(
            parse_anchor_name("Shelf12"),
            Some(AnchorKey::new(AnchorRole::Shelf, 11))
        );
    }

    #[test]
    fn rejects_other_names() {
        for name in [
            "Sign", "Sign0", "Sign_", "Signage1", "Table1.001", "Floor1", "", "Shelf-1", "ShelfA",
        ] {
            assert_eq!(parse_anchor_name(name), None, "{name}");
        }
    }

    #[test]
    fn node_name_round_trips() {
        for role in AnchorRole::ALL {
            for slot in 0..3 {
                let key = AnchorKey::new(role, slot);
                assert_eq!(parse_anchor_name(&key.to_string()), Some(key));
            }
        }
    }
}
