pub mod shared {
    pub mod annotation;
    pub mod constants;
    pub mod detection;
    pub mod frame;
}

pub mod detection {
    pub mod domain {
        pub mod frame_annotator;
        pub mod object_detector;
    }
    pub mod infrastructure;
}

pub mod alert {
    pub mod alarm_player;
    pub mod domain {
        pub mod alarm_sound;
        pub mod alarm_state;
        pub mod alert_evaluator;
        pub mod target_set;
    }
}

pub mod audio {
    pub mod domain {
        pub mod audio_segment;
    }
    pub mod infrastructure {
        pub mod cpal_alarm_sound;
        pub mod ffmpeg_audio_decoder;
    }
}

pub mod video {
    pub mod domain {
        pub mod display_surface;
        pub mod frame_source;
    }
    pub mod infrastructure;
}

pub mod pipeline {
    pub mod capture_loop;
    pub mod monitor_logger;
}
