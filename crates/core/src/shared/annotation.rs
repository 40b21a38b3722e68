use crate::shared::frame::Frame;

/// Text for one detection's label tag.
///
/// The tag background is already painted into the frame; the display
/// rasterises `text` in white starting at `origin`, the bottom-left of the
/// text baseline in pixel coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct LabelTag {
    pub text: String,
    pub origin: (u32, u32),
    pub font_scale: f32,
    pub thickness: u32,
}

/// A frame ready for display: boxes and tag backgrounds drawn, tag text
/// still to be rendered.
#[derive(Clone, Debug)]
pub struct AnnotatedFrame {
    pub frame: Frame,
    pub tags: Vec<LabelTag>,
}
