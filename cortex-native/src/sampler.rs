//! `BuildSampler`/`Sample`/`FreeSampler` (spec §4.1).

use crate::context::ContextHandle;
use crate::error::NativeError;
use crate::token::TokenId;

/// Knobs accepted by `BuildSampler` (spec §4.1).
#[derive(Debug, Clone)]
pub struct SamplerParams {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub repeat_penalty: f32,
    pub seed: u32,
    pub min_p: Option<f32>,
    pub typical_p: Option<f32>,
    pub mirostat: Option<MirostatParams>,
    pub grammar: Option<String>,
}

/// Mirostat sampling parameters, passed through when requested.
#[derive(Debug, Clone, Copy)]
pub struct MirostatParams {
    pub version: u8,
    pub tau: f32,
    pub eta: f32,
}

/// A constructed sampler chain, ready for repeated `Sample` calls against
/// one context. Not shared across contexts — repetition penalty state is
/// per-chain.
pub struct SamplerChain {
    raw: *mut llama_cpp_sys_2::llama_sampler,
}

unsafe impl Send for SamplerChain {}

impl SamplerChain {
    /// `BuildSampler` (spec §4.1).
    ///
    /// Grammar-constrained sampling (`params.grammar`) is intentionally not
    /// wired to a GBNF compiler here — that's a larger integration than this
    /// binding owns; a chain built with `grammar: Some(_)` logs and falls
    /// back to the ungrammared chain rather than silently ignoring the request.
    pub fn build(params: &SamplerParams) -> Result<Self, NativeError> {
        let chain_params = unsafe { llama_cpp_sys_2::llama_sampler_chain_default_params() };
        let raw = unsafe { llama_cpp_sys_2::llama_sampler_chain_init(chain_params) };
        if raw.is_null() {
            return Err(NativeError::Sample {
                reason: "native library returned a null sampler chain".to_string(),
            });
        }

        if params.grammar.is_some() {
            tracing::warn!("grammar-constrained sampling requested but not supported; ignoring");
        }

        unsafe {
            if params.repeat_penalty != 1.0 {
                let penalties = llama_cpp_sys_2::llama_sampler_init_penalties(
                    64,
                    params.repeat_penalty,
                    0.0,
                    0.0,
                );
                llama_cpp_sys_2::llama_sampler_chain_add(raw, penalties);
            }
            if params.top_k > 0 {
                let top_k = llama_cpp_sys_2::llama_sampler_init_top_k(params.top_k as i32);
                llama_cpp_sys_2::llama_sampler_chain_add(raw, top_k);
            }
            if let Some(typical_p) = params.typical_p {
                let typical = llama_cpp_sys_2::llama_sampler_init_typical(typical_p, 1);
                llama_cpp_sys_2::llama_sampler_chain_add(raw, typical);
            }
            if params.top_p < 1.0 {
                let top_p = llama_cpp_sys_2::llama_sampler_init_top_p(params.top_p, 1);
                llama_cpp_sys_2::llama_sampler_chain_add(raw, top_p);
            }
            if let Some(min_p) = params.min_p {
                let min_p = llama_cpp_sys_2::llama_sampler_init_min_p(min_p, 1);
                llama_cpp_sys_2::llama_sampler_chain_add(raw, min_p);
            }
            if (params.temperature - 1.0).abs() > f32::EPSILON {
                let temp = llama_cpp_sys_2::llama_sampler_init_temp(params.temperature);
                llama_cpp_sys_2::llama_sampler_chain_add(raw, temp);
            }
            if let Some(mirostat) = &params.mirostat {
                let sampler = if mirostat.version == 2 {
                    llama_cpp_sys_2::llama_sampler_init_mirostat_v2(
                        params.seed,
                        mirostat.tau,
                        mirostat.eta,
                    )
                } else {
                    llama_cpp_sys_2::llama_sampler_init_mirostat(
                        0,
                        params.seed,
                        mirostat.tau,
                        mirostat.eta,
                        100,
                    )
                };
                llama_cpp_sys_2::llama_sampler_chain_add(raw, sampler);
            } else {
                let dist = llama_cpp_sys_2::llama_sampler_init_dist(params.seed);
                llama_cpp_sys_2::llama_sampler_chain_add(raw, dist);
            }
        }

        Ok(Self { raw })
    }

    /// `Sample` (spec §4.1) — draws the next token from the context's
    /// current logits and accepts it into the chain's internal state
    /// (repetition-penalty history, mirostat estimate, ...).
    pub fn sample(&self, context: &ContextHandle) -> TokenId {
        let token = unsafe { llama_cpp_sys_2::llama_sampler_sample(self.raw, context.raw(), -1) };
        unsafe { llama_cpp_sys_2::llama_sampler_accept(self.raw, token) };
        token
    }

    /// Reset per-chain sampling state (repetition history, mirostat
    /// estimate) without rebuilding the chain — used when a recycled
    /// session starts a fresh generation (spec §4.3).
    pub fn reset(&self) {
        unsafe { llama_cpp_sys_2::llama_sampler_reset(self.raw) };
    }
}

impl Drop for SamplerChain {
    fn drop(&mut self) {
        if !self.raw.is_null() {
            unsafe { llama_cpp_sys_2::llama_sampler_free(self.raw) };
            self.raw = std::ptr::null_mut();
        }
    }
}
