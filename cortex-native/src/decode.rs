//! `Decode` (spec §4.1) — advances the context over one or more tokens.

use crate::context::ContextHandle;
use crate::error::NativeError;
use crate::token::TokenId;

/// Advance `context` over `tokens`, starting at KV-cache position `n_past`.
/// Tokens are submitted in batches of at most the context's configured
/// batch size; only the final token of the whole call requests logits.
pub fn decode(context: &ContextHandle, tokens: &[TokenId], n_past: i32) -> Result<(), NativeError> {
    if tokens.is_empty() {
        return Ok(());
    }

    let batch_size = context.batch_size() as usize;
    let mut processed = 0usize;

    while processed < tokens.len() {
        let take = (tokens.len() - processed).min(batch_size);
        let chunk = &tokens[processed..processed + take];
        let is_last_chunk = processed + take == tokens.len();

        let mut batch = unsafe { llama_cpp_sys_2::llama_batch_init(batch_size as i32, 0, 1) };
        unsafe {
            let token_slice = std::slice::from_raw_parts_mut(batch.token, chunk.len());
            token_slice.copy_from_slice(chunk);

            let pos_slice = std::slice::from_raw_parts_mut(batch.pos, chunk.len());
            for (i, slot) in pos_slice.iter_mut().enumerate() {
                *slot = n_past + (processed + i) as i32;
            }

            let n_seq_slice = std::slice::from_raw_parts_mut(batch.n_seq_id, chunk.len());
            let seq_heads = std::slice::from_raw_parts_mut(batch.seq_id, chunk.len());
            let logits_slice = std::slice::from_raw_parts_mut(batch.logits, chunk.len());

            for i in 0..chunk.len() {
                n_seq_slice[i] = 1;
                std::slice::from_raw_parts_mut(seq_heads[i], 1)[0] = 0;
                logits_slice[i] = u8::from(is_last_chunk && i == chunk.len() - 1);
            }
        }
        batch.n_tokens = chunk.len() as i32;

        let status = unsafe { llama_cpp_sys_2::llama_decode(context.raw(), batch) };
        unsafe { llama_cpp_sys_2::llama_batch_free(batch) };

        if status != 0 {
            return Err(NativeError::Decode { code: status });
        }
        processed += chunk.len();
    }

    Ok(())
}
