use crate::shared::annotation::AnnotatedFrame;

/// Where annotated frames are shown to the operator.
pub trait DisplaySurface {
    /// Presents `annotated`, replacing whatever was shown before. Surfaces
    /// that cannot render text may ignore the tags.
    fn show(&mut self, annotated: &AnnotatedFrame) -> Result<(), Box<dyn std::error::Error>>;

    /// Polls for the operator's quit request without blocking for more than
    /// a moment.
    fn exit_requested(&mut self) -> bool;

    fn close(&mut self);
}
