// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

pub mod ls;
pub mod mkdir;
pub mod mv;
pub mod rm;
pub mod touch;
pub mod tree;

pub use ls::ls_command;
pub use mkdir::mkdir_command;
pub use mv::mv_command;
pub use rm::rm_command;
pub use touch::touch_command;
pub use tree::tree_command;
