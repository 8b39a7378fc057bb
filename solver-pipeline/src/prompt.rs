//! Fixed prompt texts and formatting helpers.
//!
//! The instruction texts are in Chinese to match the exam corpus and the
//! models they were tuned against. Layout of the generation prompt:
//! knowledge block first, then the problem block, then the solving
//! instructions.

/// Instruction sent to the vision model alongside the problem image.
pub const OCR_INSTRUCTION: &str = "\
请识别这张图片中的数学题目，将题目内容完整地提取出来。要求：
1. 保持题目的原始结构和格式
2. 数学公式请用LaTeX格式表示
3. 只输出题目内容，不要添加其他解释
4. 如果是选择题，请完整列出所有选项
5. 确保文本准确无误";

/// Opens the knowledge block of the generation prompt.
pub const KNOWLEDGE_HEADER: &str = "相关知识点：\n";

/// Stands in for the knowledge block when nothing relevant was retrieved.
pub const NO_CONTEXT_LINE: &str = "（未检索到相关知识点）\n";

/// Opens the problem block.
pub const PROBLEM_HEADER: &str = "\n请解答以下数学题目：\n\n题目：\n";

/// Solving instructions appended after the problem text.
pub const SOLVE_TEMPLATE: &str = "\n
请按照以下要求进行解答：
1. 分析题目考查的知识点
2. 给出详细的解题步骤
3. 使用LaTeX格式表示数学公式
4. 最终给出答案
5. 如果题目有多个小问，请分别解答

请开始解答：";

/// Marker appended where a passage was tail-truncated to fit the budget.
pub const TRUNCATION_MARK: &str = "…\n";

/// Rank/source/score tag printed above each passage in the knowledge block.
pub fn passage_header(rank: usize, source: &str, score: f32) -> String {
    format!("==[{rank}]== {source} (score {score:.3})\n")
}
