use {
    std::{fmt, str::FromStr},
    serde::{Serialize, Deserialize},
    thiserror::Error,
};

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpgradeKind {
    Pickaxe,
    Friend,
    Beacon,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum UpgradeEffect {
    /// +1 block per click
    Bpc,
    /// blocks per second multiplied by the upgrade multiplier
    Bps,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Upgrade {
    pub kind: UpgradeKind,
    pub cost: i64,
    pub multiplier: f64,
    pub effect: UpgradeEffect,
}

#[derive(Error, Debug, Eq, PartialEq)]
#[error("unknown upgrade: {name:?}")]
pub struct UnknownUpgrade {
    pub name: String,
}

const CATALOG: [Upgrade; 3] = [
    Upgrade { kind: UpgradeKind::Pickaxe, cost: 10, multiplier: 1.0, effect: UpgradeEffect::Bpc },
    Upgrade { kind: UpgradeKind::Friend, cost: 100, multiplier: 1.5, effect: UpgradeEffect::Bps },
    Upgrade { kind: UpgradeKind::Beacon, cost: 1000, multiplier: 2.0, effect: UpgradeEffect::Bps },
];

impl UpgradeKind {
    pub const ALL: [UpgradeKind; 3] = [Self::Pickaxe, Self::Friend, Self::Beacon];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Pickaxe => "pickaxe",
            Self::Friend => "friend",
            Self::Beacon => "beacon",
        }
    }

    pub fn upgrade(&self) -> Upgrade {
        match self {
            Self::Pickaxe => CATALOG[0],
            Self::Friend => CATALOG[1],
            Self::Beacon => CATALOG[2],
        }
    }
}

impl fmt::Display for UpgradeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for UpgradeKind {
    type Err = UnknownUpgrade;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| UnknownUpgrade { name: s.to_owned() })
    }
}

impl Upgrade {
    pub fn catalog() -> &'static [Upgrade] {
        &CATALOG
    }

    /// Price of buying the next level when `level` levels are already owned.
    pub fn cost_at(&self, level: u32) -> i64 {
        let level = i32::try_from(level).unwrap_or(i32::MAX);
        (self.cost as f64 * self.multiplier.powi(level)).floor() as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_names() {
        assert_eq!(UpgradeKind::Pickaxe, "pickaxe".parse().unwrap());
        assert_eq!(UpgradeKind::Friend, "friend".parse().unwrap());
        assert_eq!(UpgradeKind::Beacon, "beacon".parse().unwrap());
    }

    #[test]
    fn parse_unknown_name() {
        let err = "Pickaxe".parse::<UpgradeKind>().unwrap_err();
        assert_eq!(UnknownUpgrade { name: "Pickaxe".to_owned() }, err);
    }

    #[test]
    fn pickaxe_cost_is_flat() {
        let pickaxe = UpgradeKind::Pickaxe.upgrade();
        assert_eq!(10, pickaxe.cost_at(0));
        assert_eq!(10, pickaxe.cost_at(25));
    }

    #[test]
    fn friend_cost_grows_and_truncates() {
        let friend = UpgradeKind::Friend.upgrade();
        assert_eq!(100, friend.cost_at(0));
        assert_eq!(150, friend.cost_at(1));
        assert_eq!(225, friend.cost_at(2));
        assert_eq!(337, friend.cost_at(3));
    }

    #[test]
    fn beacon_cost_doubles() {
        let beacon = UpgradeKind::Beacon.upgrade();
        assert_eq!(1000, beacon.cost_at(0));
        assert_eq!(8000, beacon.cost_at(3));
    }

    #[test]
    fn catalog_effects() {
        let effects: Vec<_> = Upgrade::catalog().iter().map(|v| (v.kind, v.effect)).collect();
        assert_eq!(vec![
            (UpgradeKind::Pickaxe, UpgradeEffect::Bpc),
            (UpgradeKind::Friend, UpgradeEffect::Bps),
            (UpgradeKind::Beacon, UpgradeEffect::Bps),
        ], effects);
    }
}
