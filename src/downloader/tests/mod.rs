use super::test_helpers::{FakeArchive, SubjectScript, create_test_downloader, test_config};
use super::*;
use crate::credentials::Credentials;
use crate::types::{Event, ItemStatus, JobId};
