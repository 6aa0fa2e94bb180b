use image::{Rgb, RgbImage};

use crate::annotate::style::OverlayStyle;
use crate::annotate::text::{draw_text, put_pixel_clipped};
use crate::models::{FaceRegion, FrameAnalysis};

/// Banner text for one analyzed frame, top to bottom. Gender and emotion
/// scores print as percentages; face confidence stays a fraction.
pub fn display_lines(analysis: &FrameAnalysis) -> Vec<String> {
    let attributes = &analysis.attributes;
    vec![
        format!("Age: {}", attributes.age),
        format!("Face Confidence: {:.3}", analysis.detection.confidence()),
        format!(
            "Gender: {} {:.3}",
            attributes.dominant_gender,
            attributes.dominant_gender_score() * 100.0
        ),
        format!("Race: {}", attributes.dominant_race),
        format!(
            "Dominant Emotion: {} {:.1}",
            attributes.dominant_emotion,
            attributes.dominant_emotion_score() * 100.0
        ),
    ]
}

/// Return an annotated copy of `frame`.
///
/// The face box and its label go down first, then the banner is blended
/// over the top rows, then the banner lines are written on top.
pub fn annotate(
    frame: &RgbImage,
    face: FaceRegion,
    label: &str,
    lines: &[String],
    style: &OverlayStyle,
) -> RgbImage {
    let mut out = frame.clone();

    draw_face_box(&mut out, face, style);
    draw_text(
        &mut out,
        label,
        face.x,
        face.y.saturating_sub(style.label_offset),
        style.box_color,
    );

    blend_banner(&mut out, style);

    let mut baseline = style.first_baseline;
    for line in lines {
        draw_text(&mut out, line, style.text_margin_x, baseline, style.text_color);
        baseline = baseline.saturating_add(style.line_pitch);
    }

    out
}

/// Linear blend of a solid banner over the top `banner_height` rows.
fn blend_banner(frame: &mut RgbImage, style: &OverlayStyle) {
    let alpha = style.banner_opacity.clamp(0.0, 1.0);
    let rows = style.banner_height.min(frame.height());
    let banner = style.banner_color;

    for y in 0..rows {
        for x in 0..frame.width() {
            let px = frame.get_pixel_mut(x, y);
            for c in 0..3 {
                let mixed = banner[c] as f32 * alpha + px[c] as f32 * (1.0 - alpha);
                px[c] = mixed.round().clamp(0.0, 255.0) as u8;
            }
        }
    }
}

/// Hollow rectangle, `box_thickness` pixels wide, drawn inward from the
/// region edge. Nothing is painted for zero-sized regions.
fn draw_face_box(frame: &mut RgbImage, face: FaceRegion, style: &OverlayStyle) {
    if face.width == 0 || face.height == 0 {
        return;
    }

    let left = face.x as i64;
    let top = face.y as i64;
    let right = left + face.width as i64 - 1;
    let bottom = top + face.height as i64 - 1;

    for inset in 0..style.box_thickness as i64 {
        let (l, t, r, b) = (left + inset, top + inset, right - inset, bottom - inset);
        if l > r || t > b {
            break;
        }
        hline(frame, l, r, t, style.box_color);
        hline(frame, l, r, b, style.box_color);
        vline(frame, l, t, b, style.box_color);
        vline(frame, r, t, b, style.box_color);
    }
}

fn hline(frame: &mut RgbImage, x0: i64, x1: i64, y: i64, color: Rgb<u8>) {
    if y < 0 || y >= frame.height() as i64 {
        return;
    }
    let from = x0.max(0);
    let to = x1.min(frame.width() as i64 - 1);
    for x in from..=to {
        put_pixel_clipped(frame, x, y, color);
    }
}

fn vline(frame: &mut RgbImage, x: i64, y0: i64, y1: i64, color: Rgb<u8>) {
    if x < 0 || x >= frame.width() as i64 {
        return;
    }
    let from = y0.max(0);
    let to = y1.min(frame.height() as i64 - 1);
    for y in from..=to {
        put_pixel_clipped(frame, x, y, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::attributes::fixtures::analysis_with_emotion;
    use crate::models::Detection;

    const GREEN: Rgb<u8> = Rgb([0, 255, 0]);

    fn black(width: u32, height: u32) -> RgbImage {
        RgbImage::new(width, height)
    }

    #[test]
    fn banner_dominates_blend() {
        let frame = RgbImage::from_pixel(640, 480, Rgb([105, 105, 105]));
        let out = annotate(
            &frame,
            FaceRegion::new(200, 200, 50, 50),
            "happy",
            &[],
            &OverlayStyle::default(),
        );

        // 255 * 0.9 + 105 * 0.1 = 240
        assert_eq!(*out.get_pixel(639, 0), Rgb([240, 240, 240]));
        assert_eq!(*out.get_pixel(639, 99), Rgb([240, 240, 240]));
        assert_eq!(*out.get_pixel(639, 100), Rgb([105, 105, 105]));
    }

    #[test]
    fn input_frame_is_untouched() {
        let frame = black(320, 240);
        let lines = display_lines(&analysis_with_emotion("sad"));
        let out = annotate(
            &frame,
            FaceRegion::new(100, 120, 40, 40),
            "sad",
            &lines,
            &OverlayStyle::default(),
        );

        assert!(frame.pixels().all(|px| *px == Rgb([0, 0, 0])));
        assert_eq!(out.dimensions(), frame.dimensions());
    }

    #[test]
    fn face_box_is_two_pixels_wide() {
        let frame = black(320, 240);
        let out = annotate(
            &frame,
            FaceRegion::new(100, 150, 40, 40),
            "",
            &[],
            &OverlayStyle::default(),
        );

        assert_eq!(*out.get_pixel(100, 170), GREEN);
        assert_eq!(*out.get_pixel(101, 170), GREEN);
        assert_eq!(*out.get_pixel(102, 170), Rgb([0, 0, 0]));
        assert_eq!(*out.get_pixel(139, 189), GREEN);
        assert_eq!(*out.get_pixel(120, 170), Rgb([0, 0, 0]));
    }

    #[test]
    fn label_sits_above_box() {
        let frame = black(320, 240);
        let out = annotate(
            &frame,
            FaceRegion::new(100, 180, 40, 40),
            "fear",
            &[],
            &OverlayStyle::default(),
        );

        // baseline 170, glyph rows 162..170
        let label_pixels = (162..170)
            .flat_map(|y| (100..132).map(move |x| (x, y)))
            .filter(|(x, y)| *out.get_pixel(*x, *y) == GREEN)
            .count();
        assert!(label_pixels > 0);
    }

    #[test]
    fn box_under_banner_is_faded() {
        let frame = black(320, 240);
        let out = annotate(
            &frame,
            FaceRegion::new(50, 20, 40, 120),
            "",
            &[],
            &OverlayStyle::default(),
        );

        let faded = *out.get_pixel(50, 60);
        assert_eq!(faded[1], 255);
        assert!(faded[0] > 200 && faded[0] < 255);
        assert_eq!(*out.get_pixel(50, 120), GREEN);
    }

    #[test]
    fn out_of_bounds_box_is_drawn_best_effort() {
        let frame = black(100, 100);
        let out = annotate(
            &frame,
            FaceRegion::new(-20, 150, 500, 500),
            "neutral",
            &[],
            &OverlayStyle::default(),
        );
        assert_eq!(out.dimensions(), (100, 100));

        let out = annotate(
            &frame,
            FaceRegion::new(0, 0, 0, 0),
            "neutral",
            &[],
            &OverlayStyle::default(),
        );
        assert_eq!(*out.get_pixel(50, 50), Rgb([0, 0, 0]));
    }

    #[test]
    fn full_frame_fallback_box_hugs_edges() {
        let frame = black(200, 200);
        let out = annotate(
            &frame,
            FaceRegion::full_frame(200, 200),
            "",
            &[],
            &OverlayStyle::default(),
        );
        assert_eq!(*out.get_pixel(0, 150), GREEN);
        assert_eq!(*out.get_pixel(199, 150), GREEN);
        assert_eq!(*out.get_pixel(100, 199), GREEN);
    }

    #[test]
    fn lines_are_written_in_banner() {
        let frame = black(400, 200);
        let lines = vec!["Age: 31".to_string()];
        let out = annotate(
            &frame,
            FaceRegion::new(300, 150, 10, 10),
            "",
            &lines,
            &OverlayStyle::default(),
        );

        let ink = (7..15)
            .flat_map(|y| (10..66).map(move |x| (x, y)))
            .filter(|(x, y)| *out.get_pixel(*x, *y) == Rgb([0, 0, 0]))
            .count();
        assert!(ink > 0);
    }

    #[test]
    fn display_lines_format() {
        let analysis = analysis_with_emotion("happy");
        let lines = display_lines(&analysis);
        assert_eq!(
            lines,
            vec![
                "Age: 29".to_string(),
                "Face Confidence: 0.923".to_string(),
                "Gender: Woman 97.130".to_string(),
                "Race: asian".to_string(),
                "Dominant Emotion: happy 87.0".to_string(),
            ]
        );
    }

    #[test]
    fn display_lines_for_no_face() {
        let mut analysis = analysis_with_emotion("neutral");
        analysis.detection = Detection::NoFace {
            fallback_region: FaceRegion::full_frame(640, 480),
        };
        let lines = display_lines(&analysis);
        assert_eq!(lines[1], "Face Confidence: 0.000");
    }

    #[test]
    fn extreme_analyzer_coordinates_do_not_overflow() {
        let body = r#"[{
            "age": 40,
            "dominant_emotion": "fear",
            "emotion": {"fear": 55.0},
            "dominant_gender": "Man",
            "gender": {"Man": 80.0},
            "dominant_race": "white",
            "region": {"x": 0, "y": -2147483645, "w": 10, "h": 10},
            "face_confidence": 0.7
        }]"#;
        let analysis = crate::analysis::response::parse_analysis(body).unwrap();
        let frame = black(64, 48);

        let out = annotate(
            &frame,
            analysis.detection.region(),
            "fear",
            &display_lines(&analysis),
            &OverlayStyle::default(),
        );
        assert_eq!(out.dimensions(), (64, 48));

        let style = OverlayStyle {
            line_pitch: i32::MAX,
            ..OverlayStyle::default()
        };
        let lines = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        annotate(&frame, FaceRegion::new(i32::MAX, i32::MIN, 4, 4), "x", &lines, &style);
    }
}
