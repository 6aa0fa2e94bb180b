use image::Rgb;

/// Colors and geometry used when annotating a frame.
#[derive(Debug, Clone)]
pub struct OverlayStyle {
    pub banner_height: u32,
    /// Weight of the banner in the blend; the frame gets `1 - banner_opacity`.
    pub banner_opacity: f32,
    pub banner_color: Rgb<u8>,
    pub text_color: Rgb<u8>,
    pub text_margin_x: i32,
    pub first_baseline: i32,
    pub line_pitch: i32,
    pub box_color: Rgb<u8>,
    pub box_thickness: u32,
    /// Distance between the label baseline and the top of the face box.
    pub label_offset: i32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            banner_height: 100,
            banner_opacity: 0.9,
            banner_color: Rgb([255, 255, 255]),
            text_color: Rgb([0, 0, 0]),
            text_margin_x: 10,
            first_baseline: 15,
            line_pitch: 20,
            box_color: Rgb([0, 255, 0]),
            box_thickness: 2,
            label_offset: 10,
        }
    }
}
