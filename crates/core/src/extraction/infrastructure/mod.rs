pub mod png_face_writer;
