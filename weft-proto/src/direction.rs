/// Which way a fragment/event-key walk moves relative to room history.
///
/// A sum type rather than a boolean so call sites read `Direction::Forward`
/// instead of an unannotated `true`, per the engine's design notes (spec §9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Toward the live end of the room (newer events).
    Forward,
    /// Toward the start of history (older events).
    Backward,
}

impl Direction {
    pub fn is_forward(self) -> bool { matches!(self, Direction::Forward) }

    pub fn is_backward(self) -> bool { matches!(self, Direction::Backward) }

    pub fn reverse(self) -> Direction {
        match self {
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
        }
    }

    /// The `dir` query parameter value the Matrix `/messages` endpoint expects.
    pub fn as_api_string(self) -> &'static str {
        match self {
            Direction::Forward => "f",
            Direction::Backward => "b",
        }
    }

    /// `true` maps to `Forward`, matching the boolean the overlap detector
    /// derives from `direction.isForward` when constructing a
    /// `FragmentBoundaryEntry` for a neighbour (spec §4.1 step 2).
    pub fn from_is_forward(is_forward: bool) -> Direction {
        if is_forward {
            Direction::Forward
        } else {
            Direction::Backward
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reverse_is_involutive() {
        assert_eq!(Direction::Forward.reverse().reverse(), Direction::Forward);
        assert_eq!(Direction::Backward.reverse(), Direction::Forward);
    }

    #[test]
    fn api_strings() {
        assert_eq!(Direction::Forward.as_api_string(), "f");
        assert_eq!(Direction::Backward.as_api_string(), "b");
    }
}
