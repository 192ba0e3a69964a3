pub fn status_body(status: &str) -> String {
    return serde_json::json!({ "status": status }).to_string();
}

pub fn solution_fixture() -> &'static str {
    return r#"
class Solution:
    def twoSum(self, nums: List[int], target: int) -> List[int]:
        seen = {}
        for idx, num in enumerate(nums):
            if target - num in seen:
                return [seen[target - num], idx]
            seen[num] = idx
        return []
"#
    .trim();
}
