// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod items;
pub mod statements;
pub mod importer;
pub mod exporter;
pub mod allocate;
pub mod suggest;
pub mod settle;
pub mod config;
pub mod doctor;
