mod dispatcher;
mod worker;

use super::test_helpers::*;
use super::*;
use crate::types::{Event, TaskRecord, TaskRequest, TaskStatus};
use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
