//! Feature encoding: one-hot and label encoders, min/max scaling, and the
//! fitted schema that ties them together.

pub mod encoder;
pub mod scaler;
pub mod schema;
pub mod transformer;

pub use encoder::{LabelEncoder, OneHotEncoder};
pub use scaler::MinMaxScaler;
pub use schema::{ColumnRoles, EncoderState, FeatureSchema, SchemaPaths};
pub use transformer::{FeatureTransformer, FitOutput};
