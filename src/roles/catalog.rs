//! Static role catalog, loaded once and shared without locking.

use once_cell::sync::Lazy;

use crate::game::types::Team;

/// The default role handed out once a team's pool runs dry.
pub const FALLBACK_ROLE: &str = "lambda";

/// Which team(s) a role may be dealt to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Affinity {
    Bleu,
    Rouge,
    /// Dealt into both team pools independently.
    Both,
    /// Only dealt when the room holds at least two traitors.
    TraitorOnly,
}

/// How many copies of a role go into one team's pool.
#[derive(Clone, Copy)]
pub enum CountPolicy {
    Fixed(u32),
    /// Evaluated against `(total_players, traitor_count)`.
    ByThreshold(fn(usize, usize) -> u32),
}

impl CountPolicy {
    pub fn evaluate(&self, total_players: usize, traitor_count: usize) -> u32 {
        match self {
            CountPolicy::Fixed(n) => *n,
            CountPolicy::ByThreshold(f) => f(total_players, traitor_count),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PowerFlags {
    pub can_kill: bool,
    pub kills_per_period: u8,
    pub reveals_team_on_use: bool,
}

pub struct RoleDefinition {
    pub key: &'static str,
    pub name: &'static str,
    pub affinity: Affinity,
    /// Lower is dealt first. Reserved for deterministic-assignment modes;
    /// traitor-only roles are handed out in priority order today.
    pub priority: u8,
    pub count: CountPolicy,
    pub powers: PowerFlags,
}

fn vigile_count(total_players: usize, _traitors: usize) -> u32 {
    (total_players / 8) as u32
}

/// Process-wide catalog. Order is irrelevant; priority decides.
pub static CATALOG: Lazy<Vec<RoleDefinition>> = Lazy::new(|| {
    vec![
        RoleDefinition {
            key: "tueur",
            name: "Tueur",
            affinity: Affinity::Both,
            priority: 1,
            count: CountPolicy::Fixed(1),
            powers: PowerFlags {
                can_kill: true,
                kills_per_period: 1,
                reveals_team_on_use: false,
            },
        },
        RoleDefinition {
            key: "espion",
            name: "Espion",
            affinity: Affinity::Both,
            priority: 2,
            count: CountPolicy::Fixed(1),
            powers: PowerFlags {
                can_kill: false,
                kills_per_period: 0,
                reveals_team_on_use: true,
            },
        },
        RoleDefinition {
            key: "vigile",
            name: "Vigile",
            affinity: Affinity::Both,
            priority: 3,
            count: CountPolicy::ByThreshold(vigile_count),
            powers: PowerFlags::default(),
        },
        RoleDefinition {
            key: "traitre",
            name: "Traître",
            affinity: Affinity::TraitorOnly,
            priority: 1,
            count: CountPolicy::Fixed(1),
            powers: PowerFlags {
                can_kill: true,
                kills_per_period: 1,
                reveals_team_on_use: false,
            },
        },
        RoleDefinition {
            key: "complice",
            name: "Complice",
            affinity: Affinity::TraitorOnly,
            priority: 2,
            count: CountPolicy::Fixed(1),
            powers: PowerFlags::default(),
        },
        RoleDefinition {
            key: FALLBACK_ROLE,
            name: "Lambda",
            affinity: Affinity::Both,
            priority: 99,
            // Never pooled; dealt as the fallback once pools run dry.
            count: CountPolicy::Fixed(0),
            powers: PowerFlags::default(),
        },
    ]
});

/// Look up a role definition by key.
pub fn role(key: &str) -> Option<&'static RoleDefinition> {
    CATALOG.iter().find(|r| r.key == key)
}

/// Traitor-only roles, ordered by priority.
pub fn traitor_roles() -> Vec<&'static RoleDefinition> {
    let mut out: Vec<_> = CATALOG
        .iter()
        .filter(|r| r.affinity == Affinity::TraitorOnly)
        .collect();
    out.sort_by_key(|r| r.priority);
    out
}

/// Whether a team may receive this role from its pool.
pub fn pools_for(def: &RoleDefinition) -> &'static [Team] {
    match def.affinity {
        Affinity::Bleu => &[Team::Bleu],
        Affinity::Rouge => &[Team::Rouge],
        Affinity::Both => &[Team::Bleu, Team::Rouge],
        Affinity::TraitorOnly => &[],
    }
}
