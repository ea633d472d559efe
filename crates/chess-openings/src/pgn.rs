//! PGN mainline reading and replay.
//!
//! Only the mainline matters here: variations are skipped, comments and
//! NAGs are ignored, and tags are kept as plain strings. Any other
//! mainline token that does not read as a move fails the game.

use std::collections::HashMap;
use std::io::{self, BufRead};
use std::ops::ControlFlow;

use pgn_reader::{Nag, RawComment, RawTag, Reader, SanPlus, Skip, Visitor};
use shakmaty::{CastlingMode, Chess, Position};
use thiserror::Error;

use crate::fingerprint::Fingerprint;

/// Errors that can occur when reading PGN text.
#[derive(Debug, Error)]
pub enum PgnError {
    /// Failed to read the source.
    #[error("failed to read PGN: {0}")]
    IoError(#[from] io::Error),

    /// A mainline token is not a move, move number, annotation or result.
    #[error("unreadable movetext token \"{0}\"")]
    UnreadableToken(String),
}

/// A SAN move that is not legal in the position it is played from.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("ply {ply} ({san}) cannot be played: {reason}")]
pub struct ReplayError {
    /// 1-based ply index of the offending move.
    pub ply: usize,
    /// The move as written.
    pub san: String,
    /// Why it was rejected.
    pub reason: String,
}

/// One half-move of a replayed game.
#[derive(Debug, Clone)]
pub struct Ply {
    /// 1-based ply index.
    pub number: usize,
    /// The move in SAN, as written in the source.
    pub san: String,
    /// The move in UCI long algebraic notation (e.g. "e2e4", "e7e8q").
    pub uci: String,
    /// The position after the move.
    pub position: Chess,
}

impl Ply {
    /// Fingerprint of the position after this move.
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(&self.position)
    }
}

/// The tags and mainline moves of a single PGN game.
#[derive(Debug, Clone, Default)]
pub struct Mainline {
    tags: HashMap<String, String>,
    moves: Vec<SanPlus>,
}

impl Mainline {
    /// Parses the first game in `pgn`. Returns `Ok(None)` if the text holds no game.
    pub fn parse(pgn: &str) -> Result<Option<Self>, PgnError> {
        Self::games(pgn.as_bytes()).next().transpose()
    }

    /// Reads the games of `source` one record at a time.
    pub fn games<R: BufRead>(source: R) -> Games<R> {
        Games {
            lines: source.lines(),
            pending: None,
        }
    }

    fn read_record(text: &str) -> Result<Option<Self>, PgnError> {
        check_movetext(text)?;
        let mut reader = Reader::new(text.as_bytes());
        Ok(reader.read_game(&mut MainlineVisitor)?)
    }

    /// Value of a tag, if present and non-empty.
    #[must_use]
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Number of mainline moves.
    #[must_use]
    pub fn len(&self) -> usize {
        self.moves.len()
    }

    /// Returns true if the game has no moves.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    /// Replays the mainline from the standard starting position.
    ///
    /// Every move is checked for legality before anything is returned, so a
    /// successful replay is a complete and legal game.
    pub fn replay(&self) -> Result<Vec<Ply>, ReplayError> {
        let mut position = Chess::default();
        let mut plies = Vec::with_capacity(self.moves.len());
        for (index, san) in self.moves.iter().enumerate() {
            let uci = play(&mut position, index + 1, san)?;
            plies.push(Ply {
                number: index + 1,
                san: san.to_string(),
                uci,
                position: position.clone(),
            });
        }
        Ok(plies)
    }

    /// The position reached at the end of the mainline.
    pub fn final_position(&self) -> Result<Chess, ReplayError> {
        let mut position = Chess::default();
        for (index, san) in self.moves.iter().enumerate() {
            play(&mut position, index + 1, san)?;
        }
        Ok(position)
    }
}

fn play(position: &mut Chess, ply: usize, san: &SanPlus) -> Result<String, ReplayError> {
    let m = san.san.to_move(position).map_err(|e| ReplayError {
        ply,
        san: san.to_string(),
        reason: e.to_string(),
    })?;
    let uci = m.to_uci(CastlingMode::Standard).to_string();
    position.play_unchecked(m);
    Ok(uci)
}

/// Iterator over the games of a PGN stream. See [`Mainline::games`].
pub struct Games<R> {
    lines: io::Lines<R>,
    pending: Option<String>,
}

impl<R: BufRead> Iterator for Games<R> {
    type Item = Result<Mainline, PgnError>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut record = self.pending.take().unwrap_or_default();
        let mut in_movetext = false;
        let mut in_comment = false;
        for line in self.lines.by_ref() {
            let line = match line {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            let blank = line.trim().is_empty();
            let tag_line = !in_comment && line.trim_start().starts_with('[');
            if in_movetext && !in_comment && (blank || tag_line) {
                if tag_line {
                    self.pending = Some(line + "\n");
                }
                break;
            }
            if !tag_line {
                in_comment = comment_open_after(&line, in_comment);
                in_movetext |= !blank;
            }
            record.push_str(&line);
            record.push('\n');
        }
        Mainline::read_record(&record).transpose()
    }
}

fn comment_open_after(line: &str, mut open: bool) -> bool {
    for c in line.chars() {
        match (open, c) {
            (true, '}') => open = false,
            (false, '{') => open = true,
            (false, ';') => break,
            _ => {}
        }
    }
    open
}

/// Checks every mainline token of a record. Tag pairs, comments and
/// variations are not looked at.
fn check_movetext(text: &str) -> Result<(), PgnError> {
    let mut rest = text;
    let mut depth = 0usize;
    loop {
        rest = rest.trim_start();
        let Some(c) = rest.chars().next() else {
            return Ok(());
        };
        match c {
            '{' => rest = after(rest, '}'),
            ';' | '[' | '%' => rest = after(rest, '\n'),
            '(' => {
                depth += 1;
                rest = &rest[1..];
            }
            ')' => {
                depth = depth.saturating_sub(1);
                rest = &rest[1..];
            }
            _ => {
                let end = rest
                    .find(|c: char| c.is_whitespace() || matches!(c, '{' | '(' | ')' | ';'))
                    .unwrap_or(rest.len());
                let (token, tail) = rest.split_at(end);
                if depth == 0 && !is_readable(token) {
                    return Err(PgnError::UnreadableToken(token.to_string()));
                }
                rest = tail;
            }
        }
    }
}

fn after(text: &str, end: char) -> &str {
    text.find(end).map_or("", |i| &text[i + end.len_utf8()..])
}

fn is_readable(token: &str) -> bool {
    if matches!(token, "1-0" | "0-1" | "1/2-1/2" | "½-½" | "*") {
        return true;
    }
    if let Some(nag) = token.strip_prefix('$') {
        return !nag.is_empty() && nag.bytes().all(|b| b.is_ascii_digit());
    }

    // "12.", "12...", "1.e4"
    let unnumbered = token.trim_start_matches(|c: char| c.is_ascii_digit());
    let token = if unnumbered.len() < token.len() && unnumbered.starts_with('.') {
        unnumbered.trim_start_matches('.')
    } else {
        token
    };
    let token = token.trim_end_matches(['!', '?']);
    token.is_empty()
        || matches!(token.trim_end_matches(['+', '#']), "0-0" | "0-0-0")
        || SanPlus::from_ascii(token.as_bytes()).is_ok()
}

struct MainlineVisitor;

impl Visitor for MainlineVisitor {
    type Tags = HashMap<String, String>;
    type Movetext = Mainline;
    type Output = Mainline;

    fn begin_tags(&mut self) -> ControlFlow<Self::Output, Self::Tags> {
        ControlFlow::Continue(HashMap::new())
    }

    fn tag(
        &mut self,
        tags: &mut Self::Tags,
        key: &[u8],
        value: RawTag<'_>,
    ) -> ControlFlow<Self::Output> {
        let key = String::from_utf8_lossy(key).into_owned();
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        tags.insert(key, value);
        ControlFlow::Continue(())
    }

    fn begin_movetext(&mut self, tags: Self::Tags) -> ControlFlow<Self::Output, Self::Movetext> {
        ControlFlow::Continue(Mainline {
            tags,
            moves: Vec::new(),
        })
    }

    fn san(&mut self, movetext: &mut Self::Movetext, san: SanPlus) -> ControlFlow<Self::Output> {
        movetext.moves.push(san);
        ControlFlow::Continue(())
    }

    fn nag(&mut self, _: &mut Self::Movetext, _: Nag) -> ControlFlow<Self::Output> {
        ControlFlow::Continue(())
    }

    fn comment(&mut self, _: &mut Self::Movetext, _: RawComment<'_>) -> ControlFlow<Self::Output> {
        ControlFlow::Continue(())
    }

    fn partial_comment(
        &mut self,
        _: &mut Self::Movetext,
        _: RawComment<'_>,
    ) -> ControlFlow<Self::Output> {
        ControlFlow::Continue(())
    }

    fn begin_variation(&mut self, _: &mut Self::Movetext) -> ControlFlow<Self::Output, Skip> {
        ControlFlow::Continue(Skip(true))
    }

    fn end_game(&mut self, movetext: Self::Movetext) -> Self::Output {
        movetext
    }
}
