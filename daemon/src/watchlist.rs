/// Player-name normalization and the LP-loss watchlist.
///
/// Filenames carry player names with underscores (`lp_loss_Faker_Jr.txt`);
/// configuration carries them comma-separated in whatever casing the operator
/// typed. Both sides go through [`normalize`] before comparison.
use std::collections::HashSet;

/// Replaces every `_` with a space and lowercases the result.
///
/// Idempotent: `normalize(normalize(x)) == normalize(x)`.
pub fn normalize(name: &str) -> String {
    name.replace('_', " ").to_lowercase()
}

/// Immutable set of normalized player names eligible for LP-loss notifications.
#[derive(Debug, Clone, Default)]
pub struct Watchlist {
    names: HashSet<String>,
}

impl Watchlist {
    /// Builds a watchlist from raw names. Entries are trimmed and normalized;
    /// blank entries are dropped.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names = names
            .into_iter()
            .map(|n| normalize(n.as_ref().trim()))
            .filter(|n| !n.is_empty())
            .collect();
        Self { names }
    }

    /// Parses a comma-separated list such as `"player1,Player_Two"`.
    pub fn from_csv(csv: &str) -> Self {
        Self::new(csv.split(','))
    }

    /// Returns `true` iff `normalized` is an exact member of the list.
    pub fn contains(&self, normalized: &str) -> bool {
        self.names.contains(normalized)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
