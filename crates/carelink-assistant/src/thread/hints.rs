use carelink_common::Notification;

/// Feature hints raised after a successful answer, keyed on the question.
pub fn keyword_hints(question: &str) -> Vec<Notification> {
    let q = question.to_lowercase();
    let mut hints = Vec::new();
    if q.contains("fetal movement") || q.contains("baby kicking") {
        hints.push(Notification::info(
            "Feature",
            "Fetal tracking available in settings.",
        ));
    }
    if q.contains("prescription") {
        hints.push(Notification::info(
            "Success",
            "Prescription processed or upload an image.",
        ));
    }
    hints
}
