/// Defines experiment phases and behavior
pub trait Phase: Copy + Clone + PartialEq + Send + Sync + std::fmt::Debug + Default {
    fn allows_input(&self) -> bool;
    fn next(&self) -> Option<Self>;

    fn is_welcome(&self) -> bool {
        false
    }
    fn is_experiment(&self) -> bool {
        false
    }
    fn is_debrief(&self) -> bool {
        false
    }
}

#[derive(Copy, Debug, Clone, PartialEq, Default)]
pub enum StandardPhase {
    #[default]
    Welcome,
    Experiment,
    Debrief,
}

impl Phase for StandardPhase {
    fn allows_input(&self) -> bool {
        !matches!(self, Self::Debrief)
    }

    fn next(&self) -> Option<Self> {
        use StandardPhase::*;
        Some(match self {
            Welcome => Experiment,
            Experiment => Debrief,
            Debrief => return None,
        })
    }

    fn is_welcome(&self) -> bool {
        matches!(self, StandardPhase::Welcome)
    }

    fn is_experiment(&self) -> bool {
        matches!(self, StandardPhase::Experiment)
    }

    fn is_debrief(&self) -> bool {
        matches!(self, StandardPhase::Debrief)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_advance_in_order_and_terminate() {
        let mut phase = StandardPhase::default();
        assert!(phase.is_welcome());
        phase = phase.next().unwrap();
        assert!(phase.is_experiment());
        phase = phase.next().unwrap();
        assert!(phase.is_debrief());
        assert!(!phase.allows_input());
        assert_eq!(phase.next(), None);
    }
}
