//! XML support for application documents and stylesheets

pub mod dom;
pub mod pattern;
pub mod stylesheet;

pub use dom::{XmlElement, XmlNode};
pub use pattern::WildcardPattern;
