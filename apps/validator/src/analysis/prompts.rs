// Prompt template for the single résumé-vs-job-description analysis call.
// The output template below is what `parser::parse_report` reads back, so the
// header lines and field labels must stay in sync with the parser's markers.

/// Analysis prompt template.
/// Replace: {evidence_instruction}, {resume_text}, {job_description}
pub const ANALYSIS_PROMPT_TEMPLATE: &str = r#"Analyze the following resume against the job description and provide a detailed suitability report for HR staffing purposes. The report must be structured, clear and concise. Do not use asterisks (**) or Markdown headings (#) anywhere. Validate the candidate's skills, experience and education with high specificity: name the exact skills used in named projects and the concrete contributions made. Explain the scoring rationale for each section, tying it to evidence from the resume and the job description, and suggest precise, actionable ways to raise the candidate's score.

{evidence_instruction}

1. Candidate Details:
   - Extract Name, Phone Number, Email, LinkedIn URL and GitHub URL from the resume. If a value is not found, write "Not provided".

2. Sectional Analysis (Skill Match, Work Experience, Relevant Projects, Education):
   - Matches: items from the job description that the resume satisfies, each with its evidence.
   - Non-Matches: key items from the job description missing from the resume, each with an explanation.
   - Summary: a specific summary of alignment with strengths and gaps. Avoid vague phrases such as "good fit".
   - Score: a whole number out of 100.
     - Skill Match: 100 if all key skills match with evidence of use, 0 if none match, proportional otherwise.
     - Work Experience: 100 if duration and technology fully align, 0 if irrelevant.
     - Relevant Projects: 100 if projects directly match the job needs, 0 if none are relevant.
     - Education: 100 if requirements are fully met, 0 if irrelevant.
   - Enhancement Tips: specific, actionable improvements.
   Write each field on a single line.

3. Overall Summary and Score:
   - Summary: two or three evidence-based sentences on suitability from an HR perspective.
   - Overall Score: weighted average, (Skill Match * 0.3) + (Work Experience * 0.2) + (Relevant Projects * 0.3) + (Education * 0.2), as a number with one decimal place (e.g. 63.5).

Resume: {resume_text}
Job Description: {job_description}

Return the report in this exact format:
Candidate Details:
- Name: [Extracted Name]
- Phone Number: [Extracted Phone]
- Email: [Extracted Email]
- LinkedIn: [Extracted LinkedIn or Not provided]
- GitHub: [Extracted GitHub or Not provided]

Skill Match:
- Matches: [Matches with evidence]
- Non-Matches: [Missing items with explanation]
- Summary: [Evidence-based summary]
- Score: [Score]/100 - [Rationale]
- Enhancement Tips: [Suggestions]

Work Experience:
- Matches: [Matches with evidence]
- Non-Matches: [Missing items with explanation]
- Summary: [Evidence-based summary]
- Score: [Score]/100 - [Rationale]
- Enhancement Tips: [Suggestions]

Relevant Projects:
- Matches: [Matches with evidence]
- Non-Matches: [Missing items with explanation]
- Summary: [Evidence-based summary]
- Score: [Score]/100 - [Rationale]
- Enhancement Tips: [Suggestions]

Education:
- Matches: [Matches with evidence]
- Non-Matches: [Missing items with explanation]
- Summary: [Evidence-based summary]
- Score: [Score]/100 - [Rationale]
- Enhancement Tips: [Suggestions]

Overall Summary:
- [Concise, specific summary]
- Overall Score: [Weighted Score]/100"#;
