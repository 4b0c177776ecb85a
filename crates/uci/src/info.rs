//! UCI info line parsing.

/// Score in centipawns or mate distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Score {
    /// Centipawn score (100 = 1 pawn advantage).
    Cp(i32),
    /// Mate in N moves (positive = engine winning, negative = engine losing).
    Mate(i32),
}

/// Search information from engine.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EngineInfo {
    /// Search depth in plies.
    pub depth: Option<u32>,
    /// Selective search depth.
    pub seldepth: Option<u32>,
    /// Score evaluation.
    pub score: Option<Score>,
    /// The score is only a lower bound.
    pub lowerbound: bool,
    /// The score is only an upper bound.
    pub upperbound: bool,
    /// Nodes searched.
    pub nodes: Option<u64>,
    /// Nodes per second.
    pub nps: Option<u64>,
    /// Time spent in milliseconds.
    pub time: Option<u64>,
    /// Index of the line when the engine reports several.
    pub multipv: Option<u32>,
    /// Principal variation (best line found).
    pub pv: Vec<String>,
    /// Current move being searched.
    pub currmove: Option<String>,
    /// Current move number.
    pub currmovenumber: Option<u32>,
    /// Hash table usage (per mille).
    pub hashfull: Option<u32>,
    /// Arbitrary string info.
    pub string: Option<String>,
}

impl EngineInfo {
    /// Create a new empty info.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse UCI info line.
    ///
    /// Returns `None` when the line is not an `info` line. Unknown tokens and
    /// values that fail to parse are skipped.
    pub fn parse(line: &str) -> Option<Self> {
        let mut tokens = line.split_whitespace().peekable();
        if tokens.next() != Some("info") {
            return None;
        }

        let mut info = EngineInfo::new();
        while let Some(keyword) = tokens.next() {
            match keyword {
                "depth" => info.depth = parse_next(&mut tokens),
                "seldepth" => info.seldepth = parse_next(&mut tokens),
                "nodes" => info.nodes = parse_next(&mut tokens),
                "nps" => info.nps = parse_next(&mut tokens),
                "time" => info.time = parse_next(&mut tokens),
                "multipv" => info.multipv = parse_next(&mut tokens),
                "hashfull" => info.hashfull = parse_next(&mut tokens),
                "currmovenumber" => info.currmovenumber = parse_next(&mut tokens),
                "currmove" => info.currmove = tokens.next().map(str::to_string),
                "lowerbound" => info.lowerbound = true,
                "upperbound" => info.upperbound = true,
                "score" => match tokens.next() {
                    Some("cp") => {
                        if let Some(cp) = parse_next(&mut tokens) {
                            info.score = Some(Score::Cp(cp));
                        }
                    }
                    Some("mate") => {
                        if let Some(moves) = parse_next(&mut tokens) {
                            info.score = Some(Score::Mate(moves));
                        }
                    }
                    _ => {}
                },
                "pv" => {
                    while let Some(mv) = tokens.next_if(|t| !is_info_keyword(t)) {
                        info.pv.push(mv.to_string());
                    }
                }
                // Free text runs to the end of the line.
                "string" => {
                    info.string = Some(tokens.collect::<Vec<_>>().join(" "));
                    break;
                }
                _ => {}
            }
        }

        Some(info)
    }
}

fn parse_next<'a, T, I>(tokens: &mut I) -> Option<T>
where
    T: std::str::FromStr,
    I: Iterator<Item = &'a str>,
{
    tokens.next().and_then(|t| t.parse().ok())
}

fn is_info_keyword(s: &str) -> bool {
    matches!(
        s,
        "depth"
            | "seldepth"
            | "score"
            | "lowerbound"
            | "upperbound"
            | "nodes"
            | "nps"
            | "time"
            | "multipv"
            | "pv"
            | "currmove"
            | "currmovenumber"
            | "hashfull"
            | "string"
    )
}
