use serde::{Deserialize, Serialize};

use crate::store::Row;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CourtState {
    Available,
    Busy,
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Court {
    pub id: i64,
    pub seq_num: usize,
    pub number: u32,
    pub name: String,
    pub state: CourtState,
    /// Manual-assignment courts are skipped by the automatic
    /// match-to-court selection.
    pub manual_assignment_only: bool,
}

impl Row for Court {
    fn id(&self) -> i64 {
        self.id
    }
    fn seq_num(&self) -> usize {
        self.seq_num
    }
    fn set_seq_num(&mut self, n: usize) {
        self.seq_num = n;
    }
}
