// Copyright (C) 2021 Oren Ben-Kiki
//
// This program is free software: you can redistribute it and/or modify it under the terms of the
// GNU Affero General Public License as published by the Free Software Foundation, either version 3
// of the License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without
// even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU
// Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License along with this program.
// If not, see <https://www.gnu.org/licenses/>.

//! Generate conjugate gear pairs.

use gearpair::program::main as gearpair_main;
use std::env::args;
use std::process::exit;

// BEGIN NOT TESTED
fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let flags: Vec<String> = args().collect();
    if let Err(error) = gearpair_main(&flags) {
        eprintln!("gearpair: {}", error);
        exit(1);
    }
}
// END NOT TESTED
