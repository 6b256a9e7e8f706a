pub mod tag;

pub use tag::EnrolledTag;
