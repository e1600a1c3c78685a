pub mod batch_executor;
pub mod batch_result;
pub mod check_face_use_case;
pub mod extract_faces_use_case;
pub mod infrastructure;
pub mod source_processor;
