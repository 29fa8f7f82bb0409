/// Built-in snippet for trying the pipeline without an input file.
#[derive(Debug, Clone, Copy)]
pub struct Sample {
    pub name: &'static str,
    pub language: &'static str,
    pub code: &'static str,
}

pub const SAMPLES: &[Sample] = &[
    Sample {
        name: "python_sum_array",
        language: "python",
        code: "def sum_array(arr):
    total = 0
    for x in arr:
        total += x
    return total",
    },
    Sample {
        name: "python_fibonacci",
        language: "python",
        code: "def fibonacci(n):
    if n <= 1:
        return n
    return fibonacci(n-1) + fibonacci(n-2)",
    },
    Sample {
        name: "python_binary_search",
        language: "python",
        code: "def binary_search(arr, target):
    left = 0
    right = len(arr) - 1

    while left <= right:
        mid = (left + right) // 2
        if arr[mid] == target:
            return mid
        elif arr[mid] < target:
            left = mid + 1
        else:
            right = mid - 1

    return -1",
    },
    Sample {
        name: "javascript_factorial",
        language: "javascript",
        code: "function factorial(n) {
    if (n === 0 || n === 1) {
        return 1;
    }
    return n * factorial(n - 1);
}",
    },
    Sample {
        name: "python_bubble_sort",
        language: "python",
        code: "def bubble_sort(arr):
    n = len(arr)
    for i in range(n):
        for j in range(0, n - i - 1):
            if arr[j] > arr[j + 1]:
                arr[j], arr[j + 1] = arr[j + 1], arr[j]
    return arr",
    },
];

pub fn find(name: &str) -> Option<&'static Sample> {
    SAMPLES.iter().find(|s| s.name == name)
}

pub fn names() -> Vec<&'static str> {
    SAMPLES.iter().map(|s| s.name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use codeinspector_core::detect_language;

    #[test]
    fn test_find_sample() {
        let sample = find("javascript_factorial").unwrap();
        assert_eq!(sample.language, "javascript");
        assert!(sample.code.contains("factorial(n - 1)"));
        assert!(find("missing").is_none());
    }

    #[test]
    fn test_sample_languages_match_detection() {
        for sample in SAMPLES {
            assert_eq!(detect_language(sample.code), sample.language, "{}", sample.name);
        }
    }

    #[test]
    fn test_names_are_unique() {
        let mut names = names();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), SAMPLES.len());
    }
}
