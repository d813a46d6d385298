pub mod laplacian;

pub use laplacian::{laplacian_variance_array, rank_frames, score_frames, sharpness};
