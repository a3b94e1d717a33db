/// Render the `(current/total)` counter shown on per-file progress lines.
#[must_use]
pub fn step_counter(index: usize, total: usize) -> String {
    format!("({}/{})", index + 1, total)
}

/// Join a counter and a detail the way finished progress lines show them.
#[must_use]
pub fn with_counter(counter: &str, detail: &str) -> String {
    if detail.is_empty() {
        counter.to_owned()
    } else {
        format!("{counter} {detail}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_from_one() {
        assert_eq!(step_counter(0, 4), "(1/4)");
        assert_eq!(step_counter(3, 4), "(4/4)");
    }

    #[test]
    fn joins_counter_and_detail() {
        assert_eq!(with_counter("(1/4)", "obs-webrtc.dll"), "(1/4) obs-webrtc.dll");
        assert_eq!(with_counter("(2/4)", ""), "(2/4)");
    }
}
