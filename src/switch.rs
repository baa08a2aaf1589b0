use std::collections::HashMap;
use thiserror::Error;

use crate::document::NodeId;

const NONE: u8 = 0;
const HAS_CASE: u8 = 1 << 0;
const HAS_DEFAULT: u8 = 1 << 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("case after default")]
pub struct CaseAfterDefault;

/// How a `case` joins the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseBranch {
    /// `if (...) {`
    Open,
    /// `} else if (...) {`
    Chain,
}

/// How a `default` joins the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultBranch {
    /// No case before it: the body is emitted unwrapped.
    Only,
    /// `} else {`
    Else,
}

/// Per-switch bitmask: `None -> HasCase -> HasCase|HasDefault`, or
/// `None -> HasDefault`.
#[derive(Debug, Default)]
pub struct SwitchMarkers {
    markers: HashMap<NodeId, u8>,
}

impl SwitchMarkers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, switch: NodeId) {
        self.markers.insert(switch, NONE);
    }

    pub fn enter_case(&mut self, switch: NodeId) -> Result<CaseBranch, CaseAfterDefault> {
        let marker = self.markers.entry(switch).or_insert(NONE);
        if *marker & HAS_DEFAULT != 0 {
            return Err(CaseAfterDefault);
        }
        let branch = if *marker == NONE {
            CaseBranch::Open
        } else {
            CaseBranch::Chain
        };
        *marker |= HAS_CASE;
        Ok(branch)
    }

    pub fn enter_default(&mut self, switch: NodeId) -> DefaultBranch {
        let marker = self.markers.entry(switch).or_insert(NONE);
        let branch = if *marker & HAS_CASE == 0 {
            DefaultBranch::Only
        } else {
            DefaultBranch::Else
        };
        *marker |= HAS_DEFAULT;
        branch
    }

    /// Whether an `if` chain was opened and needs its closing brace.
    pub fn close(&mut self, switch: NodeId) -> bool {
        self.markers
            .remove(&switch)
            .is_some_and(|marker| marker & HAS_CASE != 0)
    }
}
