use crate::model::{Bound, EndingKind, StatKind};

/// Side effects the simulation reports to the HUD, audio and menus.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum SimEvent {
    StatFrozen { stat: StatKind, at: Bound },
    StatActivated { stat: StatKind },
    DayAdvanced { day: u32 },
    StatIncremented { stat: StatKind, value: f32 },
    EndingTriggered { kind: EndingKind },
    NeedyStarted { stat: StatKind },
    NeedyEnded { stat: StatKind },
}

pub(crate) trait EventSink {
    fn emit(&mut self, event: SimEvent);
}

impl EventSink for Vec<SimEvent> {
    fn emit(&mut self, event: SimEvent) {
        self.push(event);
    }
}
