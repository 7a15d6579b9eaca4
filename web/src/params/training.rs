use domain::AnnotationKind;
use serde::Deserialize;
use utoipa::IntoParams;

#[derive(Debug, Deserialize, IntoParams)]
pub(crate) struct ProcessParams {
    pub(crate) kind: AnnotationKind,
}
