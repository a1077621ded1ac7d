// All LLM prompt templates for the tailoring pipeline.
// Reuses cross-cutting fragments from llm_client::prompts.

/// Instructions used when no agent instructions file is configured.
pub const DEFAULT_AGENT_INSTRUCTIONS: &str = "\
# Resume Tailoring Agent

Tailor an existing master resume to one specific job opening without changing
its structure, voice, or verified content.

- Mirror the posting's terminology where the candidate's evidence supports it.
- Swap, add, or remove at most one or two projects to improve relevance.
- Keep every metric, date, and achievement exactly as recorded.
- Never add claims the resume database cannot back up.
- Keep edits surgical: refine, don't rewrite.";

/// Requirements extraction prompt. Replace `{page_content}` before sending.
pub const REQUIREMENTS_PROMPT_TEMPLATE: &str = r#"You are a job requirements extraction specialist. Analyze the following job posting and extract:

1. **Job Title**: The exact position title
2. **Company**: Company name
3. **Location**: Work location (remote/hybrid/on-site and city)
4. **Key Responsibilities**: Main duties and responsibilities
5. **Required Skills**: Must-have technical and soft skills
6. **Preferred Skills**: Nice-to-have skills
7. **Qualifications**: Education, experience, certifications
8. **Key Technologies**: Specific tools, languages, frameworks mentioned
9. **Salary Range**: If mentioned
10. **Benefits**: Key benefits mentioned

Format the output in clean markdown with clear sections. Focus on extracting factual information without interpretation.

Job Posting Content:
{page_content}"#;

/// Resume generation prompt. Placeholders: `{agent_instructions}`,
/// `{requirements}`, `{template_html}`, `{achievements}`, `{skills}`,
/// `{technologies}`, `{roles}`, `{spelling}`, `{output_format}`.
pub const RESUME_PROMPT_TEMPLATE: &str = r#"{agent_instructions}

## Task: Generate Tailored Resume

### Position Requirements:
{requirements}

### Current Resume Template (USE THIS AS THE BASE):
{template_html}

### Available Resume Database Summary:

**Top Achievements:**
{achievements}

**Primary Skills:**
{skills}

**Technologies:**
{technologies}

**Roles Available:**
{roles}

## CRITICAL INSTRUCTIONS:

You MUST generate the complete HTML resume document NOW. DO NOT ask questions or request confirmation.

1. Analyze the position requirements and identify the most relevant achievements, skills, and technologies from the database
2. Tailor the resume HTML to emphasize matching qualifications while keeping the template's structure and styling
3. {spelling}
4. Use evidence-backed achievements with quantified metrics
5. Focus on the top 8-12 most relevant achievements
6. Optimize for ATS (Applicant Tracking Systems) by using clear section headings and keywords

{output_format}"#;

/// Recruiter outreach prompt. Placeholders: `{requirements}`, `{spelling}`.
pub const RECRUITER_MESSAGE_PROMPT_TEMPLATE: &str = r#"Based on these position requirements, write a short, professional message (3-4 sentences) to send to the recruiter expressing interest in the role. Be specific about matching qualifications. {spelling}

Position Requirements:
{requirements}

Keep it concise, confident, and professional."#;
