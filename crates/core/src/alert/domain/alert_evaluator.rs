use crate::alert::domain::target_set::TargetSet;

/// Decides whether a frame's labels should start a new alarm.
///
/// True iff at least one label (case-insensitive, exact match) is in
/// `targets` and no alarm is currently active. Pure: no state, no effects.
pub fn should_trigger<S: AsRef<str>>(labels: &[S], targets: &TargetSet, alarm_active: bool) -> bool {
    !alarm_active && labels.iter().any(|l| targets.contains(l.as_ref()))
}

/// The labels from `labels` that are on the watch-list, in input order.
pub fn matched_labels<S: AsRef<str>>(labels: &[S], targets: &TargetSet) -> Vec<String> {
    labels
        .iter()
        .filter(|l| targets.contains(l.as_ref()))
        .map(|l| AsRef::<str>::as_ref(l).to_string())
        .collect()
}
