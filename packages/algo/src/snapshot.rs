use serde::{Deserialize, Serialize};

use crate::mastery::MasteryState;
use crate::retention::RetentionState;

/// Both model states of one topic, read together.
///
/// Downstream consumers (weakness, planner, readiness) only ever see a topic
/// through this pairing so its mastery and retention come from the same
/// read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicSnapshot {
    pub topic_id: String,
    pub mastery: MasteryState,
    pub retention: Option<RetentionState>,
}

impl TopicSnapshot {
    pub fn new(
        topic_id: impl Into<String>,
        mastery: MasteryState,
        retention: Option<RetentionState>,
    ) -> Self {
        Self {
            topic_id: topic_id.into(),
            mastery,
            retention,
        }
    }
}
