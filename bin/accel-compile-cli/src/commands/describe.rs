// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `accel-compile describe`: validate a request and print the settings tree.

use std::path::PathBuf;

pub fn execute(settings: PathBuf) -> anyhow::Result<()> {
    let settings = super::load_settings(&settings)?;
    println!("{}", compile_settings::describe(&settings));
    Ok(())
}
