use opencv::core::{Mat, Mat_AUTO_STEP, Point, Scalar, CV_8UC3};
use opencv::prelude::*;
use opencv::{highgui, imgproc};

use crate::shared::annotation::AnnotatedFrame;
use crate::video::domain::display_surface::DisplaySurface;

const KEY_ESC: i32 = 27;

/// Shows frames in an OpenCV highgui window and writes the label tags with
/// `put_text`. `q`, Esc or closing the window requests exit.
pub struct HighguiDisplay {
    title: String,
    opened: bool,
}

impl HighguiDisplay {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            opened: false,
        }
    }

    fn window_closed(&self) -> bool {
        self.opened
            && highgui::get_window_property(&self.title, highgui::WND_PROP_VISIBLE)
                .map(|v| v < 1.0)
                .unwrap_or(true)
    }
}

impl DisplaySurface for HighguiDisplay {
    fn show(&mut self, annotated: &AnnotatedFrame) -> Result<(), Box<dyn std::error::Error>> {
        let frame = &annotated.frame;
        if !self.opened {
            highgui::named_window(&self.title, highgui::WINDOW_AUTOSIZE)?;
            self.opened = true;
        }

        // The Mat borrows the frame's buffer; cvt_color copies it out.
        let rgb = unsafe {
            Mat::new_rows_cols_with_data_unsafe(
                frame.height() as i32,
                frame.width() as i32,
                CV_8UC3,
                frame.data().as_ptr() as *mut _,
                Mat_AUTO_STEP,
            )
        }?;
        let mut bgr = Mat::default();
        imgproc::cvt_color(
            &rgb,
            &mut bgr,
            imgproc::COLOR_RGB2BGR,
            0,
            opencv::core::AlgorithmHint::ALGO_HINT_DEFAULT,
        )?;
        for tag in &annotated.tags {
            imgproc::put_text(
                &mut bgr,
                &tag.text,
                Point::new(tag.origin.0 as i32, tag.origin.1 as i32),
                imgproc::FONT_HERSHEY_SIMPLEX,
                tag.font_scale as f64,
                Scalar::new(255.0, 255.0, 255.0, 0.0),
                tag.thickness as i32,
                imgproc::LINE_AA,
                false,
            )?;
        }
        highgui::imshow(&self.title, &bgr)?;
        Ok(())
    }

    fn exit_requested(&mut self) -> bool {
        // wait_key also pumps the window's event loop.
        let key = highgui::wait_key(1).unwrap_or(-1);
        key == 'q' as i32 || key == 'Q' as i32 || key == KEY_ESC || self.window_closed()
    }

    fn close(&mut self) {
        if self.opened {
            let _ = highgui::destroy_window(&self.title);
            // Let the window system process the destroy.
            let _ = highgui::wait_key(1);
            self.opened = false;
        }
    }
}
