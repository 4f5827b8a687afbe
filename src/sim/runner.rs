//! 仿真驱动器
//!
//! 以固定步长推进世界，直到完成条件满足或时间预算耗尽。

use tracing::{debug, info};

use super::time::SimTime;
use super::updatable::Updatable;

/// tick 驱动器：维护当前时间并逐 tick 调用 `update`。
#[derive(Debug, Clone, Copy)]
pub struct Runner {
    /// tick 步长（毫秒）
    pub tick: SimTime,
    /// 仿真时间上限（毫秒）
    pub limit: SimTime,
}

impl Runner {
    pub fn new(tick: SimTime, limit: SimTime) -> Runner {
        Runner { tick, limit }
    }

    /// 运行直到 `done` 返回 true 或到达 `limit`，返回停止时刻。
    pub fn run<W, F>(&self, world: &mut W, mut done: F) -> SimTime
    where
        W: Updatable,
        F: FnMut(&W) -> bool,
    {
        info!(tick_ms = self.tick.0, limit_ms = self.limit.0, "▶️  开始运行仿真");

        let mut now = SimTime::ZERO;
        let mut ticks: u64 = 0;
        while now.0 < self.limit.0 {
            if done(world) {
                break;
            }
            world.update(self.tick, now);
            now = now.saturating_add(self.tick);
            ticks = ticks.saturating_add(1);
        }

        info!(total_ticks = ticks, final_ms = now.0, "✅ 仿真结束");
        debug!(completed = done(world), "停止原因");
        now
    }
}
