// Core justification calculation: grant parameters + reported execution
// data in, recognized amounts and classification out.
use shared::models::{JustificationInput, JustificationResult, ResultStatus, TrainingAction};

/// Indirect costs are recognized up to this share of the claimed total.
const INDIRECT_CAP_RATE: f64 = 0.10;

/// Deviations inside this band are rounding noise, not an over-spend.
const DEVIATION_TOLERANCE: f64 = 0.01;

fn coerced(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Computes the recognized subsidy figures for one action. Pure and
/// deterministic; cheap enough to re-run on every edit. Malformed numeric
/// input degrades to 0 rather than failing.
///
/// The caller is responsible for pairing an input with its own action; only
/// the numeric and status fields are read here.
pub fn calculate(action: &TrainingAction, input: &JustificationInput) -> JustificationResult {
    // A non-executable action earns nothing, whatever was typed in. The
    // count is otherwise taken as entered, even above the granted number.
    let effective_students = input.effective_students() as f64;

    let real_financeable_amount =
        coerced(action.hours) * effective_students * coerced(action.economic_module);

    let total_direct_costs: f64 = input.direct_costs.buckets().iter().copied().map(coerced).sum();

    let claimed_indirect_costs = coerced(input.indirect_costs);

    // The cap base is the claimed total including the uncapped indirect
    // figure. Regulatory definition; do not rebase onto recognized costs.
    let total_claimed_costs = total_direct_costs + claimed_indirect_costs;
    let indirect_cost_limit = total_claimed_costs * INDIRECT_CAP_RATE;

    let (recognized_indirect_costs, indirect_adjusted) =
        if claimed_indirect_costs > indirect_cost_limit {
            (indirect_cost_limit, true)
        } else {
            (claimed_indirect_costs, false)
        };

    let total_recognized_costs = total_direct_costs + recognized_indirect_costs;

    let deviation = real_financeable_amount - total_recognized_costs;
    let exceeded = deviation < -DEVIATION_TOLERANCE;

    let status = match (indirect_adjusted, exceeded) {
        (false, false) => ResultStatus::Ok,
        (true, false) => ResultStatus::IndirectAdjusted,
        (false, true) => ResultStatus::Exceeded,
        (true, true) => ResultStatus::AdjustedAndExceeded,
    };

    // Treasury tracks what was invoiced, so the claimed total is the base
    // here, not the capped one.
    let pending_payment = (total_claimed_costs - coerced(input.paid_amount)).max(0.0);

    JustificationResult {
        real_financeable_amount,
        total_direct_costs,
        claimed_indirect_costs,
        indirect_cost_limit,
        recognized_indirect_costs,
        total_recognized_costs,
        total_claimed_costs,
        deviation,
        status,
        pending_payment,
    }
}
