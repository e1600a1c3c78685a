pub mod extracted_face;
pub mod face_extractor;
pub mod face_writer;
