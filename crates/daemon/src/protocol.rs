// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fifo wire protocol.
//!
//! Commands arrive as a one-byte opcode, followed for `DELETE_MESSAGE` by
//! the NUL-terminated message name. Acknowledgements are the single
//! [`ACKN`] byte on the response fifo.

use afd_core::MsgName;
use afd_engine::Command;
use tracing::warn;

pub const OP_START: u8 = b'S';
pub const OP_STOP: u8 = b'T';
pub const OP_SHUTDOWN: u8 = b'X';
pub const OP_DELETE_MESSAGE: u8 = b'D';
pub const OP_FLUSH_MSG_FIFO: u8 = b'F';
pub const OP_CHECK_FSA: u8 = b'C';

/// Acknowledgement byte written to the response fifo.
pub const ACKN: u8 = b'A';

/// Encode one command into its fifo frame.
pub fn encode_command(cmd: &Command) -> Vec<u8> {
    match cmd {
        Command::Start => vec![OP_START],
        Command::Stop => vec![OP_STOP],
        Command::Shutdown => vec![OP_SHUTDOWN],
        Command::FlushMsgFifo => vec![OP_FLUSH_MSG_FIFO],
        Command::CheckFsa => vec![OP_CHECK_FSA],
        Command::DeleteMessage(msg_name) => {
            let mut frame = vec![OP_DELETE_MESSAGE];
            frame.extend_from_slice(msg_name.to_string().as_bytes());
            frame.push(0);
            frame
        }
    }
}

/// Drain every complete frame from `buf`, leaving a trailing partial
/// frame (if any) in place. Unknown opcodes are skipped with a warning.
pub fn decode_commands(buf: &mut Vec<u8>) -> Vec<Command> {
    let mut commands = Vec::new();
    let mut pos = 0;

    while pos < buf.len() {
        let opcode = buf[pos];
        match opcode {
            OP_START => {
                commands.push(Command::Start);
                pos += 1;
            }
            OP_STOP => {
                commands.push(Command::Stop);
                pos += 1;
            }
            OP_SHUTDOWN => {
                commands.push(Command::Shutdown);
                pos += 1;
            }
            OP_FLUSH_MSG_FIFO => {
                commands.push(Command::FlushMsgFifo);
                pos += 1;
            }
            OP_CHECK_FSA => {
                commands.push(Command::CheckFsa);
                pos += 1;
            }
            OP_DELETE_MESSAGE => {
                let payload = &buf[pos + 1..];
                let Some(nul) = payload.iter().position(|&b| b == 0) else {
                    break; // partial frame, wait for more bytes
                };
                let name = String::from_utf8_lossy(&payload[..nul]);
                match name.parse::<MsgName>() {
                    Ok(msg_name) => commands.push(Command::DeleteMessage(msg_name)),
                    Err(e) => warn!(name = %name, error = %e, "bad delete frame, dropping"),
                }
                pos += 1 + nul + 1;
            }
            other => {
                warn!(opcode = other, "unknown opcode on the command fifo, skipping");
                pos += 1;
            }
        }
    }

    buf.drain(..pos);
    commands
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
