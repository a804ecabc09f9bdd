//! `Tokenize`/`Detokenize` (spec §4.1).
//!
//! `Tokenize` follows the two-step sizing protocol the native library
//! exposes: a probe call with zero buffer capacity reports the needed
//! capacity as a negative count, then a second call fills a buffer sized
//! exactly to that capacity.

use std::os::raw::c_char;

use crate::error::NativeError;
use crate::model::ModelHandle;
use crate::token::TokenId;

/// `Tokenize` (spec §4.1).
pub fn tokenize(model: &ModelHandle, text: &str, add_bos: bool) -> Result<Vec<TokenId>, NativeError> {
    let bytes = text.as_bytes();
    let text_ptr = bytes.as_ptr() as *const c_char;

    let probe = unsafe {
        llama_cpp_sys_2::llama_tokenize(
            model.vocab(),
            text_ptr,
            bytes.len() as i32,
            std::ptr::null_mut(),
            0,
            add_bos,
            true,
        )
    };

    let needed = if probe < 0 { (-probe) as usize } else { probe as usize };
    if needed == 0 {
        return Ok(Vec::new());
    }

    let mut buf = vec![0 as llama_cpp_sys_2::llama_token; needed];
    let written = unsafe {
        llama_cpp_sys_2::llama_tokenize(
            model.vocab(),
            text_ptr,
            bytes.len() as i32,
            buf.as_mut_ptr(),
            buf.len() as i32,
            add_bos,
            true,
        )
    };

    if written < 0 {
        return Err(NativeError::Runtime {
            reason: format!("tokenize buffer of size {needed} was still too small"),
        });
    }
    buf.truncate(written as usize);
    Ok(buf)
}

/// `Detokenize` (spec §4.1) — never fails; returns `""` if the native
/// library can't render the token.
pub fn detokenize(model: &ModelHandle, token: TokenId) -> String {
    let mut buf = vec![0u8; 32];
    loop {
        let written = unsafe {
            llama_cpp_sys_2::llama_token_to_piece(
                model.vocab(),
                token,
                buf.as_mut_ptr() as *mut c_char,
                buf.len() as i32,
                0,
                false,
            )
        };
        if written >= 0 {
            return String::from_utf8_lossy(&buf[..written as usize]).into_owned();
        }
        let needed = (-written) as usize;
        if needed > 4096 {
            // Defends against a pathological native return; a real piece
            // is never this large.
            return String::new();
        }
        buf.resize(needed, 0);
    }
}
