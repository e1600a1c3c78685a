pub mod detector_tuning;
pub mod face_detector;
pub mod face_scorer;
pub mod sharpness;
