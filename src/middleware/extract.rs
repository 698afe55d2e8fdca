//! `Path` and `Query` whose rejections use the JSON error envelope.

use axum::extract::{Path, Query};
use axum_extra::extract::WithRejection;

use crate::error::CrmError;

pub type ApiPath<T> = WithRejection<Path<T>, CrmError>;
pub type ApiQuery<T> = WithRejection<Query<T>, CrmError>;
