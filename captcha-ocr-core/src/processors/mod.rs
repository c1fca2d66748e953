//! Pre- and post-processing around the recognition graph.
//!
//! * [`preprocess`] - resize and lay out images as NHWC tensors
//! * [`vocabulary`] - the ordered character set behind the class indices
//! * [`decode`] - CTC greedy decoding of class scores into text

pub mod decode;
pub mod preprocess;
pub mod vocabulary;

pub use decode::CTCLabelDecode;
pub use preprocess::{CaptchaPreprocessor, ChannelOrder, ModelInputSize, prepare};
pub use vocabulary::Vocabulary;
