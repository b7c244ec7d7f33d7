//! Scroll controller: issues scroll instructions and waits for the page to settle.
//!
//! Every call takes the driver by `&mut`, so a session can never have two
//! scroll instructions in flight at once.

use crate::driver::{read_viewport, PageDriver, PageHandle};
use crate::geometry::Viewport;
use crate::result::ProbeResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// Default settle delay after each scroll (750ms)
pub const DEFAULT_SETTLE_MS: u64 = 750;

/// Default distance of one generated `down` checkpoint
pub const DEFAULT_SCROLL_STEP_PX: f64 = 500.0;

/// A scroll instruction handed to the page driver
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ScrollInstruction {
    /// Scroll the document to an absolute vertical offset
    Absolute(f64),
    /// Scroll the document by a vertical delta (negative scrolls up)
    Relative(f64),
}

impl ScrollInstruction {
    /// Offset this instruction lands on when starting from `from`, clamped at 0
    #[must_use]
    pub fn target_from(self, from: f64) -> f64 {
        match self {
            Self::Absolute(y) => y.max(0.0),
            Self::Relative(dy) => (from + dy).max(0.0),
        }
    }
}

/// One scroll position at which a sample is taken.
///
/// Textual form: `top`, `y<px>`, `down<px>`, `up<px>`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Checkpoint {
    /// Top of the document
    Top,
    /// Absolute vertical offset
    At(f64),
    /// Scroll down by a distance
    Down(f64),
    /// Scroll up by a distance
    Up(f64),
}

impl Checkpoint {
    /// Instruction that reaches this checkpoint from the previous one
    #[must_use]
    pub fn instruction(self) -> ScrollInstruction {
        match self {
            Self::Top => ScrollInstruction::Absolute(0.0),
            Self::At(y) => ScrollInstruction::Absolute(y),
            Self::Down(d) => ScrollInstruction::Relative(d),
            Self::Up(d) => ScrollInstruction::Relative(-d),
        }
    }

    /// `top, scrolled-down, scrolled-further, back-to-top`
    #[must_use]
    pub fn default_sequence() -> Vec<Self> {
        Self::sequence(4, DEFAULT_SCROLL_STEP_PX)
    }

    /// `n` checkpoints: `top`, then `n - 2` steps down, then back to `top`.
    #[must_use]
    pub fn sequence(n: usize, step: f64) -> Vec<Self> {
        match n {
            0 => Vec::new(),
            1 => vec![Self::Top],
            _ => {
                let mut seq = Vec::with_capacity(n);
                seq.push(Self::Top);
                seq.extend(std::iter::repeat(Self::Down(step)).take(n - 2));
                seq.push(Self::Top);
                seq
            }
        }
    }
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Top => write!(f, "top"),
            Self::At(y) => write!(f, "y{y}"),
            Self::Down(d) => write!(f, "down{d}"),
            Self::Up(d) => write!(f, "up{d}"),
        }
    }
}

impl FromStr for Checkpoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        if s == "top" {
            return Ok(Self::Top);
        }

        let (ctor, digits): (fn(f64) -> Self, &str) = if let Some(rest) = s.strip_prefix("down") {
            (Self::Down, rest)
        } else if let Some(rest) = s.strip_prefix("up") {
            (Self::Up, rest)
        } else if let Some(rest) = s.strip_prefix('y') {
            (Self::At, rest)
        } else {
            return Err(format!("unknown checkpoint: {s}"));
        };

        let px: f64 = digits
            .parse()
            .map_err(|_| format!("invalid distance in checkpoint: {s}"))?;
        if !px.is_finite() || px < 0.0 {
            return Err(format!("checkpoint distance must be >= 0: {s}"));
        }
        Ok(ctor(px))
    }
}

impl TryFrom<String> for Checkpoint {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Checkpoint> for String {
    fn from(value: Checkpoint) -> Self {
        value.to_string()
    }
}

/// Issues scroll instructions for one session, strictly in order
#[derive(Debug, Clone)]
pub struct ScrollController {
    settle: Duration,
    issued: usize,
    last_viewport: Option<Viewport>,
}

impl Default for ScrollController {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_SETTLE_MS))
    }
}

impl ScrollController {
    /// Create a controller with the given settle delay
    #[must_use]
    pub const fn new(settle: Duration) -> Self {
        Self {
            settle,
            issued: 0,
            last_viewport: None,
        }
    }

    /// Settle delay applied after each instruction
    #[must_use]
    pub const fn settle(&self) -> Duration {
        self.settle
    }

    /// Number of instructions issued so far
    #[must_use]
    pub const fn issued(&self) -> usize {
        self.issued
    }

    /// Viewport observed after the most recent settle
    #[must_use]
    pub const fn last_viewport(&self) -> Option<Viewport> {
        self.last_viewport
    }

    /// Issue `instruction`, wait the settle delay, and return the settled viewport.
    ///
    /// Fails with `SessionLost` if the driver reports the page gone.
    pub async fn scroll_to<D>(
        &mut self,
        driver: &mut D,
        handle: PageHandle,
        instruction: ScrollInstruction,
    ) -> ProbeResult<Viewport>
    where
        D: PageDriver + ?Sized,
    {
        debug!(?handle, ?instruction, "scroll");
        driver
            .scroll(handle, instruction)
            .await
            .map_err(crate::driver::session_error)?;
        self.issued += 1;

        tokio::time::sleep(self.settle).await;

        let viewport = read_viewport(driver, handle).await?;
        debug!(?handle, scroll_y = viewport.scroll_y, "settled");
        self.last_viewport = Some(viewport);
        Ok(viewport)
    }
}
