use cnidarium::{
    StateDelta,
    StateWrite,
};
use eyre::eyre;

pub(crate) fn anyhow_to_eyre(anyhow_error: anyhow::Error) -> eyre::Report {
    let boxed: Box<dyn std::error::Error + Send + Sync> = anyhow_error.into();
    eyre!(boxed)
}

/// Applies a nested delta to its parent, carrying over the events recorded in it.
pub(crate) fn apply_with_events<S: StateWrite>(delta: StateDelta<S>) {
    let (mut state, events) = delta.apply();
    for event in events {
        state.record(event);
    }
}

/// Zero-pads a packet sequence so that storage keys sort in sequence order.
pub(crate) struct PaddedSequence(pub(crate) u64);

impl std::fmt::Display for PaddedSequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:020}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use eyre::WrapErr as _;

    use super::*;

    #[test]
    fn anyhow_to_eyre_preserves_source_chain() {
        let mut errs = ["foo", "bar", "baz"];
        let anyhow_error = anyhow::anyhow!(errs[0]).context(errs[1]);
        let eyre_from_anyhow = anyhow_to_eyre(anyhow_error).wrap_err(errs[2]);

        errs.reverse();
        for (i, err) in eyre_from_anyhow.chain().enumerate() {
            assert_eq!(errs[i], &err.to_string());
        }
    }

    #[test]
    fn padded_sequence_sorts_lexicographically() {
        let low = PaddedSequence(9).to_string();
        let high = PaddedSequence(10).to_string();
        assert!(low < high);
        assert_eq!(low.len(), 20);
    }
}
