//! Plain game data handed to the analysis core.

/// A game as an ordered list of UCI moves plus its PGN tag pairs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Game {
    /// Tag pairs in file order (`("White", "Carlsen, Magnus")`, ...).
    pub headers: Vec<(String, String)>,
    /// Mainline moves in UCI notation (`e2e4`, `e7e8q`, ...).
    pub moves: Vec<String>,
}

impl Game {
    pub fn new(headers: Vec<(String, String)>, moves: Vec<String>) -> Self {
        Self { headers, moves }
    }

    /// Value of the first tag named `key`.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// White player's name, `?` when the tag is missing.
    pub fn white(&self) -> &str {
        self.header("White").unwrap_or("?")
    }

    /// Black player's name, `?` when the tag is missing.
    pub fn black(&self) -> &str {
        self.header("Black").unwrap_or("?")
    }

    /// True if either player's name contains `needle`, ignoring case.
    /// An empty needle matches every game.
    pub fn has_player_matching(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.white().to_lowercase().contains(&needle)
            || self.black().to_lowercase().contains(&needle)
    }
}
